use std::path::PathBuf;

use thiserror::Error;

use crate::types::KeyKind;

pub type PemsealResult<T> = Result<T, PemsealError>;

#[derive(Debug, Error)]
pub enum PemsealError {
    /// A key file does not exist.
    #[error("{kind} key file not found: {}", path.display())]
    NotFound { kind: KeyKind, path: PathBuf },

    /// Unparseable PEM, or a passphrase that does not open the key.
    #[error("{0}")]
    Format(String),

    /// Cipher built without the key its direction needs, or bad key-generation parameters.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Key material that fails RSA consistency checks.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Chunk length violates the fixed-size contract of its direction.
    #[error("size error: {0}")]
    Size(String),

    /// Ciphertext failed OAEP unpadding.
    #[error("decryption failed: {0}")]
    Decrypt(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PemsealError {
    /// Short machine-friendly name of the error class.
    pub fn kind_name(&self) -> &'static str {
        match self {
            PemsealError::NotFound { .. } => "not_found",
            PemsealError::Format(_) => "format",
            PemsealError::Configuration(_) => "configuration",
            PemsealError::InvalidKey(_) => "invalid_key",
            PemsealError::Size(_) => "size",
            PemsealError::Decrypt(_) => "decrypt",
            PemsealError::Io(_) => "io",
        }
    }
}
