//! Scanner invocation with live output capture.
//!
//! [`ProcessRunner`] prepends the scanner binary path to an argument list,
//! runs it to completion, and keeps the stdout text and exit status of the most
//! recent run. Each stdout line is also forwarded to an [`OutputSink`]
//! (console by default) while the child is still running.

use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::io::config::{DEFAULT_BINARY_PATH, HarnessConfig};
use crate::io::process::{exit_code, spawn, stream_lines};
use crate::io::sink::{ConsoleSink, NullSink, OutputSink};

/// Thread count passed to `scan` when the caller does not choose one.
pub const DEFAULT_THREADS: &str = "1";

/// Export format requested from the scanner so output carries no ANSI colors.
const EXPORT_FORMAT: &str = "stdout-no-color";

pub struct ProcessRunner {
    binary: PathBuf,
    sink: Box<dyn OutputSink>,
    output: String,
    stderr: String,
    exit_status: Option<i32>,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner {
    /// Runner for the scanner at [`DEFAULT_BINARY_PATH`], echoing to the console.
    pub fn new() -> Self {
        Self::with_binary(DEFAULT_BINARY_PATH)
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            sink: Box::new(ConsoleSink),
            output: String::new(),
            stderr: String::new(),
            exit_status: None,
        }
    }

    pub fn from_config(cfg: &HarnessConfig) -> Self {
        let runner = Self::with_binary(&cfg.binary_path);
        if cfg.echo_output {
            runner
        } else {
            runner.with_sink(NullSink)
        }
    }

    /// Replace the live-output sink.
    pub fn with_sink(mut self, sink: impl OutputSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Scan a single URL. `threads` defaults to [`DEFAULT_THREADS`].
    pub fn scan(&mut self, signatures: &Path, url: &str, threads: Option<&str>) -> Result<i32> {
        self.run(scan_args(signatures, url, threads.unwrap_or(DEFAULT_THREADS)))
    }

    /// Scan every URL listed in `url_file`.
    pub fn scan_url_file(&mut self, signatures: &Path, url_file: &Path) -> Result<i32> {
        self.run(scan_url_file_args(signatures, url_file))
    }

    /// List the plugins defined in `signatures`.
    pub fn list_plugins(&mut self, signatures: &Path) -> Result<i32> {
        self.run(plugins_args(signatures))
    }

    /// Run the scanner with `args` and block until it exits.
    ///
    /// Clears the output and exit status of any previous run first. Every
    /// stdout line is appended to [`output`](Self::output) with a single
    /// trailing `\n` and forwarded to the sink; stderr is kept apart in
    /// [`stderr`](Self::stderr). Returns the recorded exit status.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Launch`](crate::HarnessError::Launch) when the binary
    /// cannot be started, [`HarnessError::StreamRead`](crate::HarnessError::StreamRead)
    /// when stdout breaks mid-run (lines read so far stay in `output`).
    #[instrument(skip_all, fields(binary = %self.binary.display()))]
    pub fn run<I, S>(&mut self, args: I) -> Result<i32>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.output.clear();
        self.stderr.clear();
        self.exit_status = None;

        let mut cmd = Command::new(&self.binary);
        cmd.args(args);

        let mut child = spawn(cmd)?;
        if let Some(stdout) = child.take_stdout()
            && let Err(e) = self.capture(stdout)
        {
            child.abort();
            return Err(e);
        }
        let run = child.wait()?;

        self.stderr = String::from_utf8_lossy(&run.stderr).into_owned();
        let code = exit_code(run.status);
        if code < 0 {
            warn!(code, "scanner terminated abnormally");
        } else {
            debug!(code, "scanner exited");
        }

        self.exit_status = Some(code);
        self.sink.exit_status(code);
        Ok(code)
    }

    /// Append every line of `reader` to the output and forward it to the sink.
    fn capture<R: Read>(&mut self, reader: R) -> Result<usize> {
        let output = &mut self.output;
        let sink = &mut self.sink;
        stream_lines(reader, &mut |line: &str| {
            output.push_str(line);
            output.push('\n');
            sink.line(line);
        })
    }

    /// Stdout captured by the most recent run, one `\n`-terminated line each.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Exit status of the most recent completed run.
    pub fn exit_status(&self) -> Option<i32> {
        self.exit_status
    }

    /// Stderr of the most recent completed run. Diagnostic only.
    pub fn stderr(&self) -> &str {
        &self.stderr
    }
}

pub fn scan_args(signatures: &Path, url: &str, threads: &str) -> Vec<OsString> {
    vec![
        "scan".into(),
        "--signatures".into(),
        signatures.into(),
        "--export".into(),
        EXPORT_FORMAT.into(),
        "--threads".into(),
        threads.into(),
        url.into(),
    ]
}

pub fn scan_url_file_args(signatures: &Path, url_file: &Path) -> Vec<OsString> {
    vec![
        "scan".into(),
        "--signatures".into(),
        signatures.into(),
        "--export".into(),
        EXPORT_FORMAT.into(),
        "--url-file".into(),
        url_file.into(),
    ]
}

pub fn plugins_args(signatures: &Path) -> Vec<OsString> {
    vec!["plugins".into(), "--signatures".into(), signatures.into()]
}
