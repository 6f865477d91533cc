//! Per-chunk RSA-OAEP (SHA-256) encryption/decryption
//!
//! Chunk sizes per direction, for a modulus of `k` bytes:
//! ```text
//! encrypt: [0 ..= k - 66 bytes plaintext]  -> [k bytes ciphertext]
//! decrypt: [k bytes ciphertext]            -> [0 ..= k - 66 bytes plaintext]
//! ```
//!
//! A 4096-bit key gives 446-byte plaintext chunks and 512-byte ciphertext chunks.

use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use pemseal_core::{Direction, PemsealError, PemsealResult};

use crate::OAEP_OVERHEAD;

/// Largest plaintext chunk OAEP/SHA-256 accepts for a modulus of `modulus_len` bytes.
pub fn max_plaintext_len(modulus_len: usize) -> usize {
    modulus_len.saturating_sub(OAEP_OVERHEAD)
}

/// A chunk transformer bound to one key and one direction for its whole lifetime.
#[derive(Clone)]
pub enum ChunkCipher {
    Encrypt(RsaPublicKey),
    Decrypt(RsaPrivateKey),
}

impl ChunkCipher {
    /// Build a cipher for `direction` from exactly one key.
    ///
    /// Encryption takes only a public key and decryption only a private key;
    /// any other combination is a `Configuration` error.
    pub fn new(
        direction: Direction,
        public_key: Option<RsaPublicKey>,
        private_key: Option<RsaPrivateKey>,
    ) -> PemsealResult<Self> {
        match (direction, public_key, private_key) {
            (Direction::Encrypt, Some(public), None) => Ok(Self::for_encryption(public)),
            (Direction::Decrypt, None, Some(private)) => Ok(Self::for_decryption(private)),
            (_, Some(_), Some(_)) => Err(PemsealError::Configuration(
                "a chunk cipher takes either a public or a private key, not both".into(),
            )),
            (Direction::Encrypt, None, _) => Err(PemsealError::Configuration(
                "encryption requires a public key".into(),
            )),
            (Direction::Decrypt, _, None) => Err(PemsealError::Configuration(
                "decryption requires a private key".into(),
            )),
        }
    }

    pub fn for_encryption(public_key: RsaPublicKey) -> Self {
        ChunkCipher::Encrypt(public_key)
    }

    pub fn for_decryption(private_key: RsaPrivateKey) -> Self {
        ChunkCipher::Decrypt(private_key)
    }

    pub fn direction(&self) -> Direction {
        match self {
            ChunkCipher::Encrypt(_) => Direction::Encrypt,
            ChunkCipher::Decrypt(_) => Direction::Decrypt,
        }
    }

    /// Modulus byte length of the bound key; also the ciphertext chunk length.
    pub fn modulus_len(&self) -> usize {
        match self {
            ChunkCipher::Encrypt(public) => public.size(),
            ChunkCipher::Decrypt(private) => private.size(),
        }
    }

    pub fn max_plaintext_len(&self) -> usize {
        max_plaintext_len(self.modulus_len())
    }

    /// Bytes to read from the input per chunk for this cipher's direction.
    pub fn input_chunk_len(&self) -> usize {
        match self.direction() {
            Direction::Encrypt => self.max_plaintext_len(),
            Direction::Decrypt => self.modulus_len(),
        }
    }

    /// Check that `chunk_size` honours this direction's fixed-size contract.
    pub fn check_chunk_size(&self, chunk_size: usize) -> PemsealResult<()> {
        match self.direction() {
            Direction::Encrypt if chunk_size == 0 || chunk_size > self.max_plaintext_len() => {
                Err(PemsealError::Size(format!(
                    "encrypt chunk size must be between 1 and {} bytes for a {}-bit key, got {chunk_size}",
                    self.max_plaintext_len(),
                    self.modulus_len() * 8
                )))
            }
            Direction::Decrypt if chunk_size != self.modulus_len() => Err(PemsealError::Size(format!(
                "decrypt chunk size must equal the key modulus length ({} bytes), got {chunk_size}",
                self.modulus_len()
            ))),
            _ => Ok(()),
        }
    }

    /// Transform one chunk in this cipher's direction.
    pub fn process_chunk(&self, chunk: &[u8]) -> PemsealResult<Vec<u8>> {
        match self {
            ChunkCipher::Encrypt(public) => encrypt_with(public, chunk),
            ChunkCipher::Decrypt(private) => decrypt_with(private, chunk),
        }
    }

    /// Encrypt one plaintext chunk of at most `max_plaintext_len()` bytes.
    ///
    /// Returns exactly `modulus_len()` bytes.
    pub fn encrypt_chunk(&self, plaintext: &[u8]) -> PemsealResult<Vec<u8>> {
        match self {
            ChunkCipher::Encrypt(public) => encrypt_with(public, plaintext),
            ChunkCipher::Decrypt(_) => Err(PemsealError::Configuration(
                "cipher is bound to decryption".into(),
            )),
        }
    }

    /// Decrypt one ciphertext chunk of exactly `modulus_len()` bytes.
    pub fn decrypt_chunk(&self, ciphertext: &[u8]) -> PemsealResult<Vec<u8>> {
        match self {
            ChunkCipher::Decrypt(private) => decrypt_with(private, ciphertext),
            ChunkCipher::Encrypt(_) => Err(PemsealError::Configuration(
                "cipher is bound to encryption".into(),
            )),
        }
    }
}

impl std::fmt::Debug for ChunkCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkCipher")
            .field("direction", &self.direction())
            .field("modulus_len", &self.modulus_len())
            .finish()
    }
}

fn encrypt_with(public: &RsaPublicKey, plaintext: &[u8]) -> PemsealResult<Vec<u8>> {
    let max = max_plaintext_len(public.size());
    if plaintext.len() > max {
        return Err(PemsealError::Size(format!(
            "plaintext chunk too long: {} bytes (maximum {max})",
            plaintext.len()
        )));
    }

    let ciphertext = public
        .encrypt(&mut rand::thread_rng(), Oaep::new::<Sha256>(), plaintext)
        .map_err(|e| PemsealError::Size(format!("chunk encryption failed: {e}")))?;

    debug_assert_eq!(ciphertext.len(), public.size());
    Ok(ciphertext)
}

fn decrypt_with(private: &RsaPrivateKey, ciphertext: &[u8]) -> PemsealResult<Vec<u8>> {
    if ciphertext.len() != private.size() {
        return Err(PemsealError::Size(format!(
            "ciphertext chunk is {} bytes but the key modulus is {} bytes; \
             the file may be truncated or was encrypted with a different key size",
            ciphertext.len(),
            private.size()
        )));
    }

    private
        .decrypt(Oaep::new::<Sha256>(), ciphertext)
        .map_err(|_| {
            PemsealError::Decrypt(
                "chunk decryption failed: wrong private key or corrupted data".into(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{shared_pair, shared_pair_b};
    use proptest::prelude::*;

    fn encryptor() -> ChunkCipher {
        ChunkCipher::for_encryption(shared_pair().public_key().clone())
    }

    fn decryptor() -> ChunkCipher {
        ChunkCipher::for_decryption(shared_pair().private_key().clone())
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let plaintext = b"hello, encrypted world!";

        let encrypted = encryptor().encrypt_chunk(plaintext).unwrap();
        let decrypted = decryptor().decrypt_chunk(&encrypted).unwrap();

        assert_eq!(&decrypted, plaintext);
    }

    #[test]
    fn test_encrypt_decrypt_empty() {
        let encrypted = encryptor().encrypt_chunk(b"").unwrap();
        assert_eq!(encrypted.len(), 128);

        let decrypted = decryptor().decrypt_chunk(&encrypted).unwrap();
        assert_eq!(decrypted, b"");
    }

    #[test]
    fn test_capacity_boundary() {
        let cipher = encryptor();
        // 1024-bit modulus: 128 - 66 = 62
        assert_eq!(cipher.max_plaintext_len(), 62);

        let at_limit = vec![0x5Au8; 62];
        let encrypted = cipher.encrypt_chunk(&at_limit).unwrap();
        assert_eq!(encrypted.len(), 128);

        let over = vec![0x5Au8; 63];
        let err = cipher.encrypt_chunk(&over).unwrap_err();
        assert!(matches!(err, PemsealError::Size(_)));
    }

    #[test]
    fn test_ciphertext_size_fixed() {
        let cipher = encryptor();
        for len in [0usize, 1, 17, 61, 62] {
            let encrypted = cipher.encrypt_chunk(&vec![1u8; len]).unwrap();
            assert_eq!(encrypted.len(), cipher.modulus_len(), "plaintext len {len}");
        }
    }

    #[test]
    fn test_encryption_is_randomized() {
        let cipher = encryptor();
        let a = cipher.encrypt_chunk(b"same").unwrap();
        let b = cipher.encrypt_chunk(b"same").unwrap();
        assert_ne!(a, b, "OAEP must not be deterministic");
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let encrypted = encryptor().encrypt_chunk(b"secret data").unwrap();
        let other = ChunkCipher::for_decryption(shared_pair_b().private_key().clone());

        let err = other.decrypt_chunk(&encrypted).unwrap_err();
        assert!(matches!(err, PemsealError::Decrypt(_)));
    }

    #[test]
    fn test_decrypt_wrong_length() {
        let encrypted = encryptor().encrypt_chunk(b"secret data").unwrap();

        let err = decryptor().decrypt_chunk(&encrypted[..127]).unwrap_err();
        assert!(matches!(err, PemsealError::Size(_)));

        let mut longer = encrypted.clone();
        longer.push(0);
        let err = decryptor().decrypt_chunk(&longer).unwrap_err();
        assert!(matches!(err, PemsealError::Size(_)));
    }

    #[test]
    fn test_tampered_ciphertext() {
        let mut encrypted = encryptor().encrypt_chunk(b"secret data").unwrap();
        encrypted[40] ^= 0xFF;

        let err = decryptor().decrypt_chunk(&encrypted).unwrap_err();
        assert!(matches!(err, PemsealError::Decrypt(_)));
    }

    #[test]
    fn test_new_requires_matching_key() {
        let pair = shared_pair();
        let public = || Some(pair.public_key().clone());
        let private = || Some(pair.private_key().clone());

        assert!(ChunkCipher::new(Direction::Encrypt, public(), None).is_ok());
        assert!(ChunkCipher::new(Direction::Decrypt, None, private()).is_ok());

        for (direction, pk, sk) in [
            (Direction::Encrypt, None, None),
            (Direction::Decrypt, None, None),
            (Direction::Encrypt, None, private()),
            (Direction::Decrypt, public(), None),
            (Direction::Encrypt, public(), private()),
            (Direction::Decrypt, public(), private()),
        ] {
            let err = ChunkCipher::new(direction, pk, sk).unwrap_err();
            assert!(matches!(err, PemsealError::Configuration(_)));
        }
    }

    #[test]
    fn test_wrong_direction_call_rejected() {
        let err = encryptor().decrypt_chunk(&[0u8; 128]).unwrap_err();
        assert!(matches!(err, PemsealError::Configuration(_)));

        let err = decryptor().encrypt_chunk(b"x").unwrap_err();
        assert!(matches!(err, PemsealError::Configuration(_)));
    }

    #[test]
    fn test_input_chunk_len_per_direction() {
        assert_eq!(encryptor().input_chunk_len(), 62);
        assert_eq!(decryptor().input_chunk_len(), 128);
        assert_eq!(max_plaintext_len(512), 446);
    }

    #[test]
    fn test_check_chunk_size() {
        let enc = encryptor();
        assert!(enc.check_chunk_size(1).is_ok());
        assert!(enc.check_chunk_size(62).is_ok());
        assert!(matches!(enc.check_chunk_size(0), Err(PemsealError::Size(_))));
        assert!(matches!(enc.check_chunk_size(63), Err(PemsealError::Size(_))));

        let dec = decryptor();
        assert!(dec.check_chunk_size(128).is_ok());
        assert!(matches!(dec.check_chunk_size(62), Err(PemsealError::Size(_))));
        assert!(matches!(dec.check_chunk_size(256), Err(PemsealError::Size(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..=62)) {
            let encrypted = encryptor().encrypt_chunk(&data).unwrap();
            prop_assert_eq!(encrypted.len(), 128);
            let decrypted = decryptor().process_chunk(&encrypted).unwrap();
            prop_assert_eq!(decrypted, data);
        }
    }
}
