//! pemseal-stream: chunked file encryption sessions with cooperative cancellation

pub mod notify;
pub mod processor;
pub mod session;

pub use notify::{NoopNotify, Notify, NotifyFn};
pub use processor::ChunkedFileProcessor;
pub use session::StopHandle;
