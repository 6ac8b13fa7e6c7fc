//! Log setup and diagnostic emission.
//!
//! Logs go to stderr so they never mix with the report on stdout.

use std::io::IsTerminal;

use paramcheck_analyze::Diagnostic;
use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber. `RUST_LOG` overrides the default level.
pub(crate) fn init(quiet: bool) {
    let default_level = if quiet { "error" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .try_init();
}

/// One warning per recovered anomaly.
pub(crate) fn emit_diagnostics(diagnostics: &[Diagnostic]) {
    for diag in diagnostics {
        match &diag.path {
            Some(path) => tracing::warn!(
                kind = %diag.kind,
                path = %path.display(),
                "{}",
                diag.message
            ),
            None => tracing::warn!(kind = %diag.kind, "{}", diag.message),
        }
    }
}
