//! Embedhost Scripting
//!
//! Runs one fixed script inside the host through an embedded QuickJS VM.
//!
//! ## Architecture
//!
//! - **ABI:** [`ScriptLibrary`] is everything the host needs from a scripting
//!   library: create engine, compile, read compile log, install output,
//!   execute, plus releases and shutdown
//! - **Lifecycle:** [`run_embedded_program`] drives one engine and one
//!   compiled unit through that interface, releasing the unit before the engine
//! - **Output:** VM output goes through [`OutputSinkAdapter`] into a
//!   [`DiagnosticChannel`], byte for byte
//! - **Failure:** fatal errors are reported and the library shut down by
//!   [`fatal::fatal`]; the host decides whether to halt
//!
//! [`QuickJs`] is the production library. Tests drive the lifecycle through
//! the recording fake in [`testing`].

pub mod abi;
pub mod channel;
pub mod error;
pub mod fatal;
pub mod lifecycle;
pub mod output;
pub mod program;
pub mod runtime;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use abi::{LibraryError, OutputConsumer, OutputStatus, ScriptLibrary};
pub use channel::{DiagnosticChannel, MemoryChannel, StderrChannel, TracingChannel};
pub use error::EmbedError;
pub use lifecycle::{run_embedded_program, RunReport};
pub use output::OutputSinkAdapter;
pub use program::{Program, EMBEDDED_PROGRAM};
pub use runtime::{EngineLimits, QuickJs};

pub use rquickjs;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
