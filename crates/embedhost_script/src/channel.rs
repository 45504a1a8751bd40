//! Diagnostic channels
//!
//! Where program output and fatal messages end up. Writes are best effort:
//! a channel that cannot deliver drops the bytes rather than failing the run.

use std::cell::RefCell;
use std::io::Write;

/// Tracing target used for forwarded program output.
pub const OUTPUT_TARGET: &str = "embedhost::output";

/// Append-only sink for diagnostic text.
pub trait DiagnosticChannel {
    /// Writes `bytes` exactly as given.
    fn write(&self, bytes: &[u8]);

    fn write_line(&self, message: &str) {
        self.write(message.as_bytes());
        self.write(b"\n");
    }
}

/// Raw bytes to the process's standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrChannel;

impl DiagnosticChannel for StderrChannel {
    fn write(&self, bytes: &[u8]) {
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(bytes);
        let _ = stderr.flush();
    }
}

/// Each write becomes one `info` event on [`OUTPUT_TARGET`].
///
/// Invalid UTF-8 is replaced, so this channel is not byte exact.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingChannel;

impl DiagnosticChannel for TracingChannel {
    fn write(&self, bytes: &[u8]) {
        tracing::info!(target: OUTPUT_TARGET, "{}", String::from_utf8_lossy(bytes));
    }
}

/// Keeps every write in memory.
#[derive(Debug, Default)]
pub struct MemoryChannel {
    writes: RefCell<Vec<Vec<u8>>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Individual writes, in the order they arrived.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.borrow().clone()
    }

    /// Everything written so far, concatenated.
    pub fn contents(&self) -> Vec<u8> {
        self.writes.borrow().concat()
    }

    pub fn contents_lossy(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }
}

impl DiagnosticChannel for MemoryChannel {
    fn write(&self, bytes: &[u8]) {
        self.writes.borrow_mut().push(bytes.to_vec());
    }
}
