//! Scripting library ABI
//!
//! The operations the lifecycle needs from an embedded scripting library.
//! The library itself is opaque; anything that can create an engine, compile
//! source into an executable unit and run it can sit behind this trait.

use std::rc::Rc;
use thiserror::Error;

/// Failure reported by a scripting library primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LibraryError {
    /// The program failed to compile and the engine holds a diagnostic log.
    #[error("compile error")]
    Compile,

    #[error("{0}")]
    Other(String),
}

impl LibraryError {
    pub fn other(message: impl Into<String>) -> Self {
        LibraryError::Other(message.into())
    }
}

/// What an output consumer tells the VM after each chunk.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OutputStatus {
    Continue,
    Abort,
}

/// Receives program output from a running unit.
///
/// `bytes` is borrowed for the duration of the call only and carries no
/// terminator; its length is authoritative.
pub trait OutputConsumer {
    fn consume(&self, bytes: &[u8]) -> OutputStatus;
}

/// An embeddable scripting library.
///
/// A `Unit<'e>` borrows the engine it was compiled by, so it can never
/// outlive it and must be released before the engine can be.
pub trait ScriptLibrary {
    type Engine;
    type Unit<'e>
    where
        Self: 'e;

    fn create_engine(&self) -> Result<Self::Engine, LibraryError>;

    fn compile<'e>(
        &'e self,
        engine: &'e Self::Engine,
        source: &str,
    ) -> Result<Self::Unit<'e>, LibraryError>;

    /// Diagnostic log left behind by the last failed compilation, if any.
    fn compile_log(&self, engine: &Self::Engine) -> Option<Vec<u8>>;

    fn install_output<'e>(
        &'e self,
        unit: &mut Self::Unit<'e>,
        consumer: Rc<dyn OutputConsumer>,
    ) -> Result<(), LibraryError>;

    fn execute<'e>(&'e self, unit: &mut Self::Unit<'e>) -> Result<(), LibraryError>;

    fn release_unit<'e>(&'e self, unit: Self::Unit<'e>);

    fn release_engine(&self, engine: Self::Engine);

    /// Frees process-wide library state. Best effort, never fails.
    fn shutdown(&self);
}
