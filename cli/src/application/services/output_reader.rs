//! Application service: drains a process's combined output on its own thread.
//!
//! Each reader reads at most `READ_CHUNK` bytes per cycle, hands the decoded
//! text to the sink and sleeps for the poll interval. A read that would block
//! only means the process is quiet. The reader stops at end of stream, on a
//! read error, or when asked to. A stop request is checked once
//! per cycle, so one more chunk may still arrive after it.

use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tilewall_common::ComponentKind;

use crate::application::ports::{OutputSink, OutputStream};
use crate::domain::ReadError;

/// Bytes requested per read.
pub const READ_CHUNK: usize = 2048;

/// Default pause between reads.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Handle to a running reader thread.
#[derive(Debug)]
pub struct OutputReader {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl OutputReader {
    /// Start reading `stream` on a thread named after `kind`.
    ///
    /// # Errors
    ///
    /// Returns `ReadError` if the thread cannot be spawned.
    pub fn spawn(
        kind: ComponentKind,
        stream: OutputStream,
        sink: Arc<dyn OutputSink>,
        poll_interval: Duration,
    ) -> Result<Self, ReadError> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name(format!("output-{kind}"))
            .spawn(move || read_loop(kind, stream, sink.as_ref(), &flag, poll_interval))
            .map_err(|source| ReadError { kind, source })?;
        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    /// Ask the reader to stop after its current cycle. Does not block.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Let the reader run on until end of stream without waiting for it.
    pub fn detach(mut self) {
        drop(self.thread.take());
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop and wait for the thread to exit.
    pub fn join(mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("output reader thread panicked");
            }
        }
    }
}

fn read_loop(
    kind: ComponentKind,
    mut stream: OutputStream,
    sink: &dyn OutputSink,
    stop: &AtomicBool,
    poll_interval: Duration,
) {
    let mut buf = [0u8; READ_CHUNK];
    let mut pending: Vec<u8> = Vec::new();

    while !stop.load(Ordering::Acquire) {
        match stream.read(&mut buf) {
            Ok(0) => {
                if !pending.is_empty() {
                    sink.deliver(kind, &String::from_utf8_lossy(&pending));
                }
                tracing::debug!(component = %kind, "output stream closed");
                return;
            }
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                let text = take_utf8(&mut pending);
                if !text.is_empty() {
                    sink.deliver(kind, &text);
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::WouldBlock => {}
            Err(source) => {
                let err = ReadError { kind, source };
                tracing::debug!(component = %kind, op = "read", error = %err, "output reader stopped");
                return;
            }
        }
        thread::sleep(poll_interval);
    }
    tracing::debug!(component = %kind, "output reader stopped on request");
}

/// Decode as much of `pending` as possible. Invalid sequences become U+FFFD.
/// An incomplete sequence at the end stays in `pending` for the next read.
fn take_utf8(pending: &mut Vec<u8>) -> String {
    let mut out = String::new();
    let mut rest: &[u8] = pending.as_slice();
    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                out.push_str(valid);
                rest = &[];
                break;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                match e.error_len() {
                    Some(len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        rest = &after[len..];
                    }
                    None => {
                        rest = after;
                        break;
                    }
                }
            }
        }
    }
    let carry = rest.to_vec();
    *pending = carry;
    out
}
