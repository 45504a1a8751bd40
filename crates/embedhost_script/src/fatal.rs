//! Terminal failure path

use crate::abi::ScriptLibrary;
use crate::channel::DiagnosticChannel;
use crate::error::EmbedError;

/// Reports `error` on the channel, then shuts the scripting library down.
///
/// Nothing is retried. Stopping forward progress is up to the host.
pub fn fatal<L: ScriptLibrary>(library: &L, channel: &dyn DiagnosticChannel, error: &EmbedError) {
    tracing::error!(error = ?error, "embedded program failed: {error}");
    channel.write_line(&error.to_string());
    library.shutdown();
}
