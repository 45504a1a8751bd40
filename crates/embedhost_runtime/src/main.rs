//! Embedhost Runtime
//!
//! Minimal binary that initializes the host, which runs the embedded program.
//!
//! Usage: `embedhost [settings.json]`

mod host;

use anyhow::{Context, Result};
use embedhost_script::QuickJs;
use embedhost_services::HostSettings;
use host::Host;
use std::path::PathBuf;

fn main() -> Result<()> {
    let settings_path = std::env::args_os().nth(1).map(PathBuf::from);
    let settings = HostSettings::load_or_default(settings_path.as_deref())?;

    // Initialize logging
    init_logging(&settings.log_level)?;

    tracing::info!("Embedhost v{}", embedhost_script::VERSION);
    match &settings_path {
        Some(path) => tracing::info!(path = %path.display(), "settings loaded"),
        None => tracing::info!("no settings file, using defaults"),
    }
    if settings.output_suppressed() {
        tracing::warn!(
            level = %settings.log_level,
            "program output is logged at info and will be filtered out"
        );
    }

    let library = QuickJs::new(host::engine_limits(&settings.engine));
    let channel = host::channel_for(settings.channel);
    let mut host = Host::new(library, settings, channel);

    host.initialize().context("host initialization failed")?;
    host.unload()?;

    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let level: tracing::Level = level
        .parse()
        .with_context(|| format!("invalid log level '{level}'"))?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
