//! Output sink adapter
//!
//! Bridges VM output callbacks to a diagnostic channel.

use crate::abi::{OutputConsumer, OutputStatus};
use crate::channel::DiagnosticChannel;
use std::cell::Cell;
use std::rc::Rc;

/// Forwards every output chunk, unchanged, to a diagnostic channel.
pub struct OutputSinkAdapter {
    channel: Rc<dyn DiagnosticChannel>,
    events: Cell<usize>,
    bytes: Cell<usize>,
}

impl OutputSinkAdapter {
    pub fn new(channel: Rc<dyn DiagnosticChannel>) -> Self {
        Self {
            channel,
            events: Cell::new(0),
            bytes: Cell::new(0),
        }
    }

    /// Number of output chunks forwarded so far.
    pub fn events(&self) -> usize {
        self.events.get()
    }

    /// Total bytes forwarded so far.
    pub fn bytes(&self) -> usize {
        self.bytes.get()
    }
}

impl OutputConsumer for OutputSinkAdapter {
    fn consume(&self, bytes: &[u8]) -> OutputStatus {
        self.channel.write(bytes);
        self.events.set(self.events.get() + 1);
        self.bytes.set(self.bytes.get() + bytes.len());
        OutputStatus::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MemoryChannel;

    #[test]
    fn forwards_exact_bytes_in_order() {
        let channel = Rc::new(MemoryChannel::new());
        let adapter = OutputSinkAdapter::new(channel.clone());

        assert_eq!(adapter.consume(b"Welcome"), OutputStatus::Continue);
        // No terminator is added or expected, embedded NULs pass through
        assert_eq!(adapter.consume(b"a\0b"), OutputStatus::Continue);
        assert_eq!(adapter.consume(b""), OutputStatus::Continue);

        assert_eq!(
            channel.writes(),
            vec![b"Welcome".to_vec(), b"a\0b".to_vec(), Vec::new()]
        );
        assert_eq!(adapter.events(), 3);
        assert_eq!(adapter.bytes(), 10);
    }
}
