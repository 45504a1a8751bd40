//! Embedhost Services Layer
//!
//! Host configuration and the plumbing around it.

pub mod settings;

pub use settings::{ChannelKind, EngineSettings, HaltPolicy, HostSettings, SettingsError};
