//! Passphrase wrapping for PKCS#8 private keys: PBES2 (PBKDF2-SHA256 + AES-256-CBC)

use pkcs8::pkcs5::pbes2;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};

use pemseal_core::{PemsealError, PemsealResult};

/// PBES2 salt length in bytes
pub const SALT_SIZE: usize = 16;

/// AES-256-CBC IV length in bytes
pub const IV_SIZE: usize = 16;

/// PBKDF2 parameters for passphrase-protected private keys
#[derive(Debug, Clone)]
pub struct KdfParams {
    /// PBKDF2-SHA256 iteration count (default: 600000)
    pub pbkdf2_iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: 600_000,
        }
    }
}

/// Random salt and IV for one wrapping operation.
///
/// Both are stored in the clear inside the `EncryptedPrivateKeyInfo`.
pub struct WrapNonce {
    pub salt: [u8; SALT_SIZE],
    pub iv: [u8; IV_SIZE],
}

impl WrapNonce {
    pub fn random() -> Self {
        let mut salt = [0u8; SALT_SIZE];
        let mut iv = [0u8; IV_SIZE];
        let mut rng = rand::thread_rng();
        rng.fill_bytes(&mut salt);
        rng.fill_bytes(&mut iv);
        Self { salt, iv }
    }
}

impl KdfParams {
    /// Build PBES2 parameters borrowing `nonce` for salt and IV.
    pub fn pbes2<'a>(&self, nonce: &'a WrapNonce) -> PemsealResult<pbes2::Parameters<'a>> {
        if self.pbkdf2_iterations == 0 {
            return Err(PemsealError::Configuration(
                "PBKDF2 iteration count must be at least 1".into(),
            ));
        }
        pbes2::Parameters::pbkdf2_sha256_aes256cbc(self.pbkdf2_iterations, &nonce.salt, &nonce.iv)
            .map_err(|e| PemsealError::Configuration(format!("invalid PBES2 parameters: {e}")))
    }
}

/// Treat an empty passphrase the same as no passphrase.
pub fn effective_passphrase(passphrase: Option<&SecretString>) -> Option<&SecretString> {
    passphrase.filter(|p| !p.expose_secret().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_nonce_random() {
        let a = WrapNonce::random();
        let b = WrapNonce::random();
        assert_ne!(a.salt, b.salt, "salts must differ");
        assert_ne!(a.iv, b.iv, "IVs must differ");
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let params = KdfParams {
            pbkdf2_iterations: 0,
        };
        let nonce = WrapNonce::random();
        let err = params.pbes2(&nonce).unwrap_err();
        assert!(matches!(err, PemsealError::Configuration(_)));
    }

    #[test]
    fn test_pbes2_params_build() {
        let params = KdfParams {
            pbkdf2_iterations: 1000,
        };
        let nonce = WrapNonce::random();
        assert!(params.pbes2(&nonce).is_ok());
    }

    #[test]
    fn test_empty_passphrase_is_none() {
        let empty = SecretString::from("");
        let real = SecretString::from("secret");
        assert!(effective_passphrase(Some(&empty)).is_none());
        assert!(effective_passphrase(Some(&real)).is_some());
        assert!(effective_passphrase(None).is_none());
    }
}
