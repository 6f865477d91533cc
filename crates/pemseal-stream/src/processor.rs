//! Chunked file processor: streams one file through a `ChunkCipher`
//!
//! Session lifecycle:
//! ```text
//! Idle ──start──▶ Running ──EOF──────▶ Completed  (emits Completed)
//!                    │    ──stop─────▶ Cancelled  (emits nothing)
//!                    └────error──────▶ Failed     (emits Error)
//! ```
//!
//! Each loop iteration checks the stop flag, reads up to `chunk_size`
//! bytes, transforms them, writes the result, and emits `Progress`.
//! Errors never escape `start`; they become an `Error` notification.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use pemseal_core::{PemsealResult, SessionOutcome};
use pemseal_crypto::{ChunkCipher, RsaPrivateKey, RsaPublicKey};

use crate::notify::Notify;
use crate::session::{ProcessingSession, StopHandle};

enum LoopExit {
    EndOfInput,
    Stopped,
}

/// Runs one processing session and reports to the injected notifier.
pub struct ChunkedFileProcessor<N: Notify> {
    notifier: N,
    stop: StopHandle,
}

impl<N: Notify> ChunkedFileProcessor<N> {
    pub fn new(notifier: N) -> Self {
        Self::with_stop_handle(notifier, StopHandle::new())
    }

    /// Use a caller-created stop handle, e.g. one already wired to a signal.
    pub fn with_stop_handle(notifier: N, stop: StopHandle) -> Self {
        Self { notifier, stop }
    }

    /// Handle for stopping this processor's session from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Request a cooperative stop; takes effect before the next chunk.
    pub fn cancel(&self) {
        self.stop.request_stop();
    }

    /// Encrypt `input_path` into `output_path` using the key's largest
    /// plaintext chunk.
    pub fn encrypt_file(
        self,
        input_path: &Path,
        output_path: &Path,
        public_key: RsaPublicKey,
    ) -> SessionOutcome {
        let cipher = ChunkCipher::for_encryption(public_key);
        let chunk_size = cipher.input_chunk_len();
        self.start(input_path, output_path, &cipher, chunk_size)
    }

    /// Decrypt `input_path` into `output_path` one modulus-length chunk at a time.
    pub fn decrypt_file(
        self,
        input_path: &Path,
        output_path: &Path,
        private_key: RsaPrivateKey,
    ) -> SessionOutcome {
        let cipher = ChunkCipher::for_decryption(private_key);
        let chunk_size = cipher.input_chunk_len();
        self.start(input_path, output_path, &cipher, chunk_size)
    }

    /// Transform `input_path` into `output_path`, `chunk_size` input bytes at a time.
    ///
    /// Blocks until the session completes, is stopped, or fails. Both files
    /// are closed before this returns.
    pub fn start(
        self,
        input_path: &Path,
        output_path: &Path,
        cipher: &ChunkCipher,
        chunk_size: usize,
    ) -> SessionOutcome {
        debug!(
            input = %input_path.display(),
            output = %output_path.display(),
            direction = %cipher.direction(),
            chunk_size,
            "session started"
        );

        let mut session = ProcessingSession::new(self.stop);
        let result = run_session(
            &mut session,
            input_path,
            output_path,
            cipher,
            chunk_size,
            &self.notifier,
        );
        let bytes = session.processed();

        match result {
            Ok(LoopExit::EndOfInput) => {
                info!(input = %input_path.display(), bytes, "session completed");
                self.notifier.completed();
                SessionOutcome::Completed { bytes }
            }
            Ok(LoopExit::Stopped) => {
                info!(input = %input_path.display(), bytes, "session stopped by request");
                SessionOutcome::Cancelled { bytes }
            }
            Err(e) => {
                let message = e.to_string();
                warn!(
                    input = %input_path.display(),
                    kind = e.kind_name(),
                    bytes,
                    "session failed: {message}"
                );
                self.notifier.error(input_path, &message);
                SessionOutcome::Failed { message }
            }
        }
    }
}

fn run_session<N: Notify>(
    session: &mut ProcessingSession,
    input_path: &Path,
    output_path: &Path,
    cipher: &ChunkCipher,
    chunk_size: usize,
    notifier: &N,
) -> PemsealResult<LoopExit> {
    cipher.check_chunk_size(chunk_size)?;

    let mut reader = BufReader::new(File::open(input_path)?);
    let mut writer = BufWriter::new(File::create(output_path)?);
    let mut buf = Zeroizing::new(vec![0u8; chunk_size]);

    loop {
        if session.should_stop() {
            writer.flush()?;
            return Ok(LoopExit::Stopped);
        }

        let n = read_full(&mut reader, &mut buf)?;
        if n == 0 {
            writer.flush()?;
            return Ok(LoopExit::EndOfInput);
        }

        let processed = Zeroizing::new(cipher.process_chunk(&buf[..n])?);
        writer.write_all(&processed)?;

        let total = session.advance(n as u64);
        notifier.progress(n as u64, total);
    }
}

/// Fill `buf` from `reader`, stopping early only at end of input.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
