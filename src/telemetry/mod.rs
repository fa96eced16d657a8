//! Logging setup
//!
//! Structured `tracing` events go to stderr so stdout stays clean for
//! results (including `--json`). `RUST_LOG` overrides the CLI verbosity.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::Verbosity;

/// Default filter directive for a verbosity level
pub fn default_directive(verbosity: Verbosity) -> &'static str {
    match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Normal => "warn",
        Verbosity::Verbose => "cliniq=info,warn",
        Verbosity::VeryVerbose => "cliniq=debug,info",
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
