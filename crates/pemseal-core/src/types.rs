use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Which way a cipher transforms chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Plaintext in, modulus-length ciphertext out (public key)
    Encrypt,
    /// Modulus-length ciphertext in, plaintext out (private key)
    Decrypt,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Encrypt => f.write_str("encrypt"),
            Direction::Decrypt => f.write_str("decrypt"),
        }
    }
}

/// Half of an RSA key pair, used in error messages and log fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Private,
    Public,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Private => f.write_str("private"),
            KeyKind::Public => f.write_str("public"),
        }
    }
}

/// Event emitted by a processing session to its observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// One chunk was transformed and written.
    ///
    /// `delta` is the input length of that chunk, `processed` the cumulative
    /// input bytes of the session so far.
    Progress { delta: u64, processed: u64 },
    /// End of input reached; output flushed.
    Completed,
    /// The session failed. `source` is the input path being processed.
    Error { source: PathBuf, message: String },
}

/// How a processing session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed { bytes: u64 },
    /// Stopped on request; `bytes` of input were transformed before the stop.
    Cancelled { bytes: u64 },
    Failed { message: String },
}

impl SessionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SessionOutcome::Completed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_serde_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            direction: Direction,
        }
        let w: Wrapper = toml::from_str(r#"direction = "decrypt""#).unwrap();
        assert_eq!(w.direction, Direction::Decrypt);
        assert_eq!(Direction::Encrypt.to_string(), "encrypt");
    }

    #[test]
    fn test_outcome_is_completed() {
        assert!(SessionOutcome::Completed { bytes: 3 }.is_completed());
        assert!(!SessionOutcome::Cancelled { bytes: 3 }.is_completed());
        assert!(!SessionOutcome::Failed { message: "x".into() }.is_completed());
    }
}
