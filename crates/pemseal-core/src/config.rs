use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration (loaded from pemseal.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PemsealConfig {
    pub log: LogConfig,
    pub keys: KeysConfig,
    pub processing: ProcessingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

/// Key generation and persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// RSA modulus size in bits (default: 4096)
    pub bits: usize,
    /// RSA public exponent, 3 or 65537 (default: 65537)
    pub public_exponent: u64,
    /// PBKDF2-SHA256 iterations for passphrase-protected private keys
    pub pbkdf2_iterations: u32,
    /// Default private key PEM path
    pub private_key: PathBuf,
    /// Default public key PEM path
    pub public_key: PathBuf,
}

/// Chunk size overrides. Absent values are derived from the key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Plaintext bytes per chunk when encrypting (at most modulus - 66)
    pub encrypt_chunk_size: Option<usize>,
    /// Ciphertext bytes per chunk when decrypting (exactly the modulus length)
    pub decrypt_chunk_size: Option<usize>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            bits: 4096,
            public_exponent: 65537,
            pbkdf2_iterations: 600_000,
            private_key: PathBuf::from("~/.config/pemseal/private_key.pem"),
            public_key: PathBuf::from("~/.config/pemseal/public_key.pem"),
        }
    }
}

/// Expand a leading `~/` to `$HOME`.
pub fn expand_tilde(path: &std::path::Path) -> PathBuf {
    if let Some(s) = path.to_str() {
        if let Some(rest) = s.strip_prefix("~/") {
            let home = std::env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp"));
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
