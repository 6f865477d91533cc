//! pemseal-crypto: RSA-OAEP chunk encryption and PEM key lifecycle
//!
//! Architecture: Chunk-then-Encrypt with RSA-OAEP (SHA-256)
//!
//! ```text
//! KeyPair (RSA, 1024..=4096 bits, e = 3 | 65537)
//!   ├── Private key: PKCS#8 PEM, optionally PBES2-wrapped (PBKDF2-SHA256, AES-256-CBC)
//!   │   └── ChunkCipher::Decrypt: k-byte ciphertext chunk → plaintext
//!   └── Public key: SubjectPublicKeyInfo PEM
//!       └── ChunkCipher::Encrypt: ≤ (k - 66)-byte plaintext chunk → k-byte ciphertext
//! ```

pub mod chunk;
pub mod kdf;
pub mod keys;

pub use chunk::{max_plaintext_len, ChunkCipher};
pub use kdf::KdfParams;
pub use keys::{KeyLifecycleManager, KeyPair};
pub use rsa::{RsaPrivateKey, RsaPublicKey};

/// OAEP overhead with SHA-256: 2 * hLen + 2
pub const OAEP_OVERHEAD: usize = 2 * 32 + 2;

/// Smallest accepted modulus size in bits
pub const MIN_KEY_BITS: usize = 1024;

/// Largest accepted modulus size in bits (the `rsa` crate's public key limit)
pub const MAX_KEY_BITS: usize = 4096;

/// Default modulus size in bits
pub const DEFAULT_KEY_BITS: usize = 4096;

/// Default public exponent
pub const DEFAULT_PUBLIC_EXPONENT: u64 = 65537;

pub const ALLOWED_PUBLIC_EXPONENTS: [u64; 2] = [3, 65537];
