//! Error type shared by the process runner and the mock server.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// The scanner binary could not be started (missing or not executable).
    #[error("launch {}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the child's stdout failed mid-run. Lines captured before the
    /// failure remain available on the runner.
    #[error("read child stdout")]
    StreamRead {
        #[source]
        source: std::io::Error,
    },

    #[error("wait for child process")]
    Wait {
        #[source]
        source: std::io::Error,
    },

    /// The mock server could not bind its listener.
    #[error("bind mock server on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("mock server already running on port {port}")]
    StartWhileRunning { port: u16 },

    /// The mock server worker thread or its runtime could not be created.
    #[error("start mock server worker")]
    Runtime {
        #[source]
        source: std::io::Error,
    },

    #[error("mock server worker panicked")]
    WorkerPanicked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_error_names_program_and_keeps_source() {
        let err = HarnessError::Launch {
            program: PathBuf::from("../bin/chopchop"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(err.to_string(), "launch ../bin/chopchop");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn start_while_running_mentions_port() {
        let err = HarnessError::StartWhileRunning { port: 8080 };
        assert!(err.to_string().contains("8080"));
    }
}
