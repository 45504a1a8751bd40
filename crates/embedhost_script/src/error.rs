use crate::abi::LibraryError;
use thiserror::Error;

/// Errors that can end an embedded program run.
///
/// The display strings are the fixed messages written to the diagnostic
/// channel by the fatal path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmbedError {
    #[error("Error while allocating a new script engine instance")]
    EngineAllocation {
        #[source]
        source: LibraryError,
    },

    /// The program text failed to compile. `log` is the compiler's
    /// diagnostic output when one was available.
    #[error("Compile error")]
    Compile { log: Option<Vec<u8>> },

    #[error("Compile error")]
    OtherCompile {
        #[source]
        source: LibraryError,
    },

    #[error("Error while installing the VM output consumer callback")]
    OutputConfig {
        #[source]
        source: LibraryError,
    },

    #[error("Error while executing the embedded program")]
    Execution {
        #[source]
        source: LibraryError,
    },
}

impl EmbedError {
    /// Whether the error goes through the fatal path without asking the caller.
    ///
    /// Execution failures happen after a clean release, so the caller decides.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EmbedError::Execution { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_shapes_share_message() {
        let with_log = EmbedError::Compile { log: Some(b"x".to_vec()) };
        let other = EmbedError::OtherCompile {
            source: LibraryError::other("bad flags"),
        };
        assert_eq!(with_log.to_string(), "Compile error");
        assert_eq!(other.to_string(), "Compile error");
    }

    #[test]
    fn only_execution_is_deferred_to_caller() {
        let execution = EmbedError::Execution {
            source: LibraryError::other("boom"),
        };
        let allocation = EmbedError::EngineAllocation {
            source: LibraryError::other("oom"),
        };
        assert!(!execution.is_fatal());
        assert!(allocation.is_fatal());
    }
}
