//! Diagnostics for the harness itself, not for the scanner it drives.
//!
//! Everything goes to stderr: stdout belongs to the scanner lines echoed by
//! [`crate::io::sink::ConsoleSink`], and tests compare it byte for byte.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Directive used when `RUST_LOG` is unset and `--verbose` is not given.
pub const QUIET: &str = "warn";
/// Directive for `--verbose`: spawn/exit and server lifecycle events.
pub const VERBOSE: &str = "warn,harness=debug";

/// Install the stderr subscriber. `RUST_LOG` wins over `fallback`.
///
/// A second call is ignored, so tests that share a process can each call it.
///
/// ```bash
/// RUST_LOG=harness::mock_server=info harness serve --port 8000
/// ```
pub fn init(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
