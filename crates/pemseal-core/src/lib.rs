pub mod config;
pub mod error;
pub mod types;

pub use error::{PemsealError, PemsealResult};
pub use types::{Direction, KeyKind, Notification, SessionOutcome};
