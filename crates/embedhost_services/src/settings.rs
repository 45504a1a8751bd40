//! Settings management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Host settings
///
/// The binary reads these before its subscriber exists, so `log_level` only
/// applies from logging init onwards; anything logged while loading is lost
/// unless the embedder installed a subscriber first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    /// `trace`, `debug`, `info`, `warn` or `error`
    ///
    /// With [`ChannelKind::Tracing`] program output is logged at `info`, so
    /// `warn` or `error` filter it out entirely (see [`Self::output_suppressed`]).
    pub log_level: String,
    pub channel: ChannelKind,
    pub halt: HaltPolicy,
    /// Treat a failed program execution like any other fatal error
    pub strict_execution: bool,
    pub engine: EngineSettings,
}

/// Where program output and fatal messages go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Raw bytes on standard error
    Stderr,
    /// `info` events on the `embedhost::output` target; subject to `log_level`
    Tracing,
}

/// What the host does once initialization has been aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltPolicy {
    /// Report the failure to the caller; the binary exits non-zero
    Exit,
    /// `std::process::abort()` on the spot
    Abort,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub memory_limit_bytes: Option<usize>,
    pub max_stack_bytes: Option<usize>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings in {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            channel: ChannelKind::Stderr,
            halt: HaltPolicy::Exit,
            strict_execution: true,
            engine: EngineSettings::default(),
        }
    }
}

impl HostSettings {
    /// Loads settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Whether `log_level` would drop everything the tracing channel writes.
    pub fn output_suppressed(&self) -> bool {
        self.channel == ChannelKind::Tracing
            && self
                .log_level
                .parse::<tracing::Level>()
                .is_ok_and(|level| level < tracing::Level::INFO)
    }

    /// Defaults when no path is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
