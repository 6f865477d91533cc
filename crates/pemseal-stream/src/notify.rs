//! Session-scoped notification channel

use std::path::Path;
use std::sync::mpsc::{Sender, SyncSender};

use pemseal_core::Notification;

/// Boxed notification callback
pub type NotifyFn = Box<dyn Fn(Notification) + Send + Sync>;

/// Receives the events of one processing session, in order, on the
/// processing thread.
pub trait Notify: Send {
    fn notify(&self, notification: Notification);

    fn progress(&self, delta: u64, processed: u64) {
        self.notify(Notification::Progress { delta, processed });
    }

    fn completed(&self) {
        self.notify(Notification::Completed);
    }

    fn error(&self, source: &Path, message: &str) {
        self.notify(Notification::Error {
            source: source.to_path_buf(),
            message: message.to_string(),
        });
    }
}

impl<F> Notify for F
where
    F: Fn(Notification) + Send,
{
    fn notify(&self, notification: Notification) {
        self(notification)
    }
}

/// Forwards events to a channel. A dropped receiver is ignored.
impl Notify for Sender<Notification> {
    fn notify(&self, notification: Notification) {
        let _ = self.send(notification);
    }
}

/// Forwards events to a bounded channel, blocking the session while it is full.
impl Notify for SyncSender<Notification> {
    fn notify(&self, notification: Notification) {
        let _ = self.send(notification);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotify;

impl Notify for NoopNotify {
    fn notify(&self, _notification: Notification) {}
}
