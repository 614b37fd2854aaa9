//! Test-support harness for driving a command-line scanner.
//!
//! Two independent pieces, composed only by the calling test suite:
//!
//! - **[`process_runner`]**: launches the scanner binary, streams its stdout
//!   line by line into a capture buffer and an [`io::sink::OutputSink`], and
//!   records the exit status.
//! - **[`mock_server`]**: a fixed-response HTTP listener on a caller-chosen
//!   port, used as a scan target. Runs on a background worker thread with an
//!   explicit start/stop lifecycle.
//!
//! Side-effecting helpers (process spawning, output sinks, config files) live
//! in [`io`].

pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod mock_server;
pub mod process_runner;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::{HarnessError, Result};
pub use mock_server::MockServer;
pub use process_runner::ProcessRunner;
