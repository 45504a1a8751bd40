//! Host integration
//!
//! The host's initialization sequence: own setup first, then the embedded
//! program exactly once, then success is reported. A fatal program failure
//! aborts initialization.

use embedhost_script::fatal::fatal;
use embedhost_script::{
    run_embedded_program, DiagnosticChannel, EmbedError, EngineLimits, ScriptLibrary,
    StderrChannel, TracingChannel, EMBEDDED_PROGRAM,
};
use embedhost_services::{ChannelKind, EngineSettings, HaltPolicy, HostSettings};
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPhase {
    Created,
    ObjectsReady,
    Initialized,
    Aborted,
    Unloaded,
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("host initialization already ran")]
    AlreadyInitialized,

    #[error("host initialization aborted")]
    InitAborted(#[source] EmbedError),

    #[error("host is not initialized")]
    NotInitialized,
}

pub struct Host<L: ScriptLibrary> {
    library: L,
    settings: HostSettings,
    channel: Rc<dyn DiagnosticChannel>,
    phase: HostPhase,
}

impl<L: ScriptLibrary> Host<L> {
    pub fn new(library: L, settings: HostSettings, channel: Rc<dyn DiagnosticChannel>) -> Self {
        Self {
            library,
            settings,
            channel,
            phase: HostPhase::Created,
        }
    }

    pub fn phase(&self) -> HostPhase {
        self.phase
    }

    #[cfg(test)]
    pub fn library(&self) -> &L {
        &self.library
    }

    /// Runs the host's initialization sequence. Only the first call does
    /// anything; the embedded program never runs twice.
    pub fn initialize(&mut self) -> Result<(), HostError> {
        if self.phase != HostPhase::Created {
            return Err(HostError::AlreadyInitialized);
        }

        tracing::info!("host initialization started");
        self.phase = HostPhase::ObjectsReady;

        match run_embedded_program(&self.library, Rc::clone(&self.channel), &EMBEDDED_PROGRAM) {
            Ok(_) => {}
            Err(error) if error.is_fatal() => return Err(self.halt(error)),
            Err(error) if self.settings.strict_execution => {
                fatal(&self.library, self.channel.as_ref(), &error);
                return Err(self.halt(error));
            }
            Err(error) => tracing::warn!("continuing after program failure: {error}"),
        }

        self.phase = HostPhase::Initialized;
        tracing::info!("host initialized");
        Ok(())
    }

    pub fn unload(&mut self) -> Result<(), HostError> {
        if self.phase != HostPhase::Initialized {
            return Err(HostError::NotInitialized);
        }
        self.phase = HostPhase::Unloaded;
        tracing::info!("host unloaded");
        Ok(())
    }

    fn halt(&mut self, error: EmbedError) -> HostError {
        self.phase = HostPhase::Aborted;
        match self.settings.halt {
            HaltPolicy::Abort => {
                tracing::error!("halting: {error}");
                std::process::abort();
            }
            HaltPolicy::Exit => HostError::InitAborted(error),
        }
    }
}

pub fn channel_for(kind: ChannelKind) -> Rc<dyn DiagnosticChannel> {
    match kind {
        ChannelKind::Stderr => Rc::new(StderrChannel),
        ChannelKind::Tracing => Rc::new(TracingChannel),
    }
}

pub fn engine_limits(engine: &EngineSettings) -> EngineLimits {
    EngineLimits {
        memory_limit: engine.memory_limit_bytes,
        max_stack_size: engine.max_stack_bytes,
    }
}
