//! Shared fixtures for pipeline integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use pemseal_core::Notification;
use pemseal_crypto::{KeyLifecycleManager, KeyPair};

/// 1024-bit key pair shared by a test binary: 128-byte ciphertext chunks,
/// 62-byte plaintext chunks.
pub fn key_pair() -> &'static KeyPair {
    static PAIR: OnceLock<KeyPair> = OnceLock::new();
    PAIR.get_or_init(|| {
        KeyLifecycleManager::default()
            .generate_key_pair(1024, 65537)
            .expect("generate key pair")
    })
}

/// A second, unrelated 1024-bit key pair.
pub fn other_key_pair() -> &'static KeyPair {
    static PAIR: OnceLock<KeyPair> = OnceLock::new();
    PAIR.get_or_init(|| {
        KeyLifecycleManager::default()
            .generate_key_pair(1024, 65537)
            .expect("generate key pair")
    })
}

pub fn write_test_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write test file");
    path
}

/// Deterministic pseudo-random content.
pub fn make_data(size: usize) -> Vec<u8> {
    (0..size as u64)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

/// Notifier that records every event for later inspection.
pub fn recorder() -> (impl Fn(Notification) + Send + Sync, Arc<Mutex<Vec<Notification>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    (move |n: Notification| sink.lock().unwrap().push(n), events)
}

pub fn count_completed(events: &[Notification]) -> usize {
    events
        .iter()
        .filter(|n| matches!(n, Notification::Completed))
        .count()
}

pub fn errors(events: &[Notification]) -> Vec<(PathBuf, String)> {
    events
        .iter()
        .filter_map(|n| match n {
            Notification::Error { source, message } => Some((source.clone(), message.clone())),
            _ => None,
        })
        .collect()
}
