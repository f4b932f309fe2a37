//! Diagnostic tracing for the CLI.
//!
//! Controlled by `RUST_LOG` and written to stderr. Separate from the run
//! log under the store's `logs/` directory, which is always written.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Defaults to `warn` when `RUST_LOG` is unset. `--verbose` raises the
/// default to `info`.
pub fn init(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
