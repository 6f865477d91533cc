//! RSA key lifecycle: generation, public key derivation, PEM persistence and parsing
//!
//! Private keys are stored as PKCS#8 PEM (`PRIVATE KEY`), or as
//! `ENCRYPTED PRIVATE KEY` when a passphrase is supplied. Public keys are
//! stored as SubjectPublicKeyInfo PEM (`PUBLIC KEY`).

use std::path::Path;

use pkcs8::der::pem::PemLabel;
use pkcs8::{EncryptedPrivateKeyInfo, PrivateKeyInfo};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use pemseal_core::{KeyKind, PemsealError, PemsealResult};

use crate::kdf::{effective_passphrase, KdfParams, WrapNonce};
use crate::{ALLOWED_PUBLIC_EXPONENTS, MAX_KEY_BITS, MIN_KEY_BITS};

/// An RSA private key and the public key derived from it.
#[derive(Clone)]
pub struct KeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl KeyPair {
    pub fn from_private(private: RsaPrivateKey) -> Self {
        let public = private.to_public_key();
        Self { private, public }
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    pub fn into_parts(self) -> (RsaPrivateKey, RsaPublicKey) {
        (self.private, self.public)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("private", &"[REDACTED]")
            .field("public", &self.public)
            .finish()
    }
}

/// Generates, persists, loads, and parses RSA key material.
#[derive(Debug, Clone, Default)]
pub struct KeyLifecycleManager {
    kdf: KdfParams,
}

impl KeyLifecycleManager {
    pub fn new(kdf: KdfParams) -> Self {
        Self { kdf }
    }

    /// Generate a fresh key pair.
    ///
    /// `bit_length` must lie in `[MIN_KEY_BITS, MAX_KEY_BITS]` and
    /// `public_exponent` must be 3 or 65537.
    pub fn generate_key_pair(&self, bit_length: usize, public_exponent: u64) -> PemsealResult<KeyPair> {
        if !(MIN_KEY_BITS..=MAX_KEY_BITS).contains(&bit_length) {
            return Err(PemsealError::Configuration(format!(
                "key size must be between {MIN_KEY_BITS} and {MAX_KEY_BITS} bits, got {bit_length}"
            )));
        }
        if !ALLOWED_PUBLIC_EXPONENTS.contains(&public_exponent) {
            return Err(PemsealError::Configuration(format!(
                "public exponent must be 3 or 65537, got {public_exponent}"
            )));
        }

        let exp = BigUint::from(public_exponent);
        let private = RsaPrivateKey::new_with_exp(&mut rand::thread_rng(), bit_length, &exp)
            .map_err(|e| PemsealError::Configuration(format!("RSA key generation failed: {e}")))?;

        info!(bits = bit_length, exponent = public_exponent, "generated RSA key pair");
        Ok(KeyPair::from_private(private))
    }

    /// Derive the public half of `private_key`.
    ///
    /// Fails with `InvalidKey` if the key is internally inconsistent. Keys
    /// built by the `rsa` crate (generated, decoded, or from components) are
    /// validated on construction, so this only guards hand-assembled keys.
    pub fn derive_public(&self, private_key: &RsaPrivateKey) -> PemsealResult<RsaPublicKey> {
        private_key
            .validate()
            .map_err(|e| PemsealError::InvalidKey(format!("not a valid RSA private key: {e}")))?;
        Ok(private_key.to_public_key())
    }

    /// Serialize `key` as PKCS#8 PEM, wrapping it with PBES2 when a
    /// non-empty passphrase is given.
    pub fn private_to_pem(
        &self,
        key: &RsaPrivateKey,
        passphrase: Option<&SecretString>,
    ) -> PemsealResult<String> {
        let pem = match effective_passphrase(passphrase) {
            None => key
                .to_pkcs8_pem(LineEnding::LF)
                .map_err(|e| PemsealError::Format(format!("encoding private key: {e}")))?
                .to_string(),
            Some(pass) => {
                let der = key
                    .to_pkcs8_der()
                    .map_err(|e| PemsealError::Format(format!("encoding private key: {e}")))?;
                let info = PrivateKeyInfo::try_from(der.as_bytes())
                    .map_err(|e| PemsealError::Format(format!("encoding private key: {e}")))?;

                let nonce = WrapNonce::random();
                let params = self.kdf.pbes2(&nonce)?;
                let encrypted = info
                    .encrypt_with_params(params, pass.expose_secret().as_bytes())
                    .map_err(|e| PemsealError::Format(format!("encrypting private key: {e}")))?;

                encrypted
                    .to_pem(EncryptedPrivateKeyInfo::PEM_LABEL, LineEnding::LF)
                    .map_err(|e| PemsealError::Format(format!("encoding private key: {e}")))?
                    .to_string()
            }
        };
        Ok(pem)
    }

    /// Serialize `key` as SubjectPublicKeyInfo PEM.
    pub fn public_to_pem(&self, key: &RsaPublicKey) -> PemsealResult<String> {
        key.to_public_key_pem(LineEnding::LF)
            .map_err(|e| PemsealError::Format(format!("encoding public key: {e}")))
    }

    /// Write `key` to `path` as PKCS#8 PEM.
    pub fn save_private(
        &self,
        path: &Path,
        key: &RsaPrivateKey,
        passphrase: Option<&SecretString>,
    ) -> PemsealResult<()> {
        let pem = self.private_to_pem(key, passphrase)?;
        std::fs::write(path, pem.as_bytes())?;
        info!(
            path = %path.display(),
            encrypted = effective_passphrase(passphrase).is_some(),
            "private key saved"
        );
        Ok(())
    }

    /// Generate a key pair with the given parameters and save its private half.
    pub fn generate_and_save_private(
        &self,
        path: &Path,
        bit_length: usize,
        public_exponent: u64,
        passphrase: Option<&SecretString>,
    ) -> PemsealResult<KeyPair> {
        let pair = self.generate_key_pair(bit_length, public_exponent)?;
        self.save_private(path, pair.private_key(), passphrase)?;
        Ok(pair)
    }

    /// Write `key` to `path` as SubjectPublicKeyInfo PEM.
    pub fn save_public(&self, path: &Path, key: &RsaPublicKey) -> PemsealResult<()> {
        let pem = self.public_to_pem(key)?;
        std::fs::write(path, pem.as_bytes())?;
        info!(path = %path.display(), "public key saved");
        Ok(())
    }

    /// Load a PKCS#8 PEM private key from `path`.
    pub fn load_private(
        &self,
        path: &Path,
        passphrase: Option<&SecretString>,
    ) -> PemsealResult<RsaPrivateKey> {
        let text = read_key_file(path, KeyKind::Private)?;
        let key = decode_private(&text, passphrase).map_err(|e| {
            PemsealError::Format(format!(
                "Failed to process private key {}. Please check file format and try again. ({e})",
                path.display()
            ))
        })?;
        info!(path = %path.display(), "private key loaded");
        Ok(key)
    }

    /// Load a SubjectPublicKeyInfo PEM public key from `path`.
    pub fn load_public(&self, path: &Path) -> PemsealResult<RsaPublicKey> {
        let text = read_key_file(path, KeyKind::Public)?;
        let key = RsaPublicKey::from_public_key_pem(text.trim()).map_err(|e| {
            PemsealError::Format(format!(
                "Failed to process public key {}. Please check file format and try again. ({e})",
                path.display()
            ))
        })?;
        info!(path = %path.display(), "public key loaded");
        Ok(key)
    }

    /// Parse a private key from PEM text, e.g. pasted by a user.
    pub fn parse_private_from_text(
        &self,
        text: &str,
        passphrase: Option<&SecretString>,
    ) -> PemsealResult<RsaPrivateKey> {
        decode_private(text, passphrase).map_err(|e| {
            PemsealError::Format(format!(
                "Failed to parse private key: it is most likely corrupted, incomplete, \
                 or the passphrase is wrong. Please check your input and try again. ({e})"
            ))
        })
    }

    /// Parse a public key from PEM text, e.g. pasted by a user.
    pub fn parse_public_from_text(&self, text: &str) -> PemsealResult<RsaPublicKey> {
        RsaPublicKey::from_public_key_pem(text.trim()).map_err(|e| {
            PemsealError::Format(format!(
                "Failed to parse public key: it is most likely corrupted or was entered \
                 incorrectly. Please check your input and try again. ({e})"
            ))
        })
    }
}

/// Decode PKCS#8 PEM, choosing the encrypted form when a passphrase is given.
fn decode_private(text: &str, passphrase: Option<&SecretString>) -> Result<RsaPrivateKey, String> {
    let text = text.trim();
    match effective_passphrase(passphrase) {
        Some(pass) => RsaPrivateKey::from_pkcs8_encrypted_pem(text, pass.expose_secret().as_bytes())
            .map_err(|e| format!("cannot decrypt private key: {e}")),
        None => RsaPrivateKey::from_pkcs8_pem(text).map_err(|e| {
            if text.contains(EncryptedPrivateKeyInfo::PEM_LABEL) {
                "private key is passphrase-protected but no passphrase was given".to_string()
            } else {
                e.to_string()
            }
        }),
    }
}

fn read_key_file(path: &Path, kind: KeyKind) -> PemsealResult<String> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PemsealError::NotFound {
            kind,
            path: path.to_path_buf(),
        },
        _ => PemsealError::Io(e),
    })?;
    String::from_utf8(bytes).map_err(|_| {
        PemsealError::Format(format!(
            "Failed to process {kind} key {}: file is not PEM text. Please check file format and try again.",
            path.display()
        ))
    })
}
