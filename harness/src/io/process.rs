//! Running the scanner as a child process and streaming its stdout.

use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, instrument, warn};

use crate::error::{HarnessError, Result};

/// What remains of a child once it has exited.
#[derive(Debug)]
pub struct StreamedRun {
    pub status: ExitStatus,
    /// Everything the child wrote to stderr. Never part of the captured output.
    pub stderr: Vec<u8>,
}

/// A launched child whose stderr is already being drained.
///
/// The caller takes stdout, reads it to EOF, then either [`wait`](Self::wait)s
/// or, after a read failure, [`abort`](Self::abort)s.
pub struct SpawnedChild {
    child: Child,
    stdout: Option<ChildStdout>,
    stderr: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
}

/// Spawn `cmd` with stdout and stderr piped.
///
/// Stderr is drained on a helper thread so the child cannot block on a full
/// pipe.
#[instrument(skip_all, fields(program = ?cmd.get_program()))]
pub fn spawn(mut cmd: Command) -> Result<SpawnedChild> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(args = ?cmd.get_args().collect::<Vec<_>>(), "spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(HarnessError::Launch {
                program: PathBuf::from(cmd.get_program()),
                source: e,
            });
        }
    };

    let stderr = child
        .stderr
        .take()
        .map(|stderr| thread::spawn(move || drain(stderr)));
    let stdout = child.stdout.take();
    Ok(SpawnedChild {
        child,
        stdout,
        stderr,
    })
}

impl SpawnedChild {
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Block until the child exits. There is no timeout.
    pub fn wait(mut self) -> Result<StreamedRun> {
        let status = self
            .child
            .wait()
            .map_err(|source| HarnessError::Wait { source })?;
        let stderr = join_stderr(self.stderr);

        debug!(
            exit_code = ?status.code(),
            stderr_bytes = stderr.len(),
            "command finished"
        );
        Ok(StreamedRun { status, stderr })
    }

    /// Kill and reap the child after stdout broke, so no zombie is left.
    pub fn abort(mut self) {
        warn!("stdout read failed, killing child");
        if let Err(e) = self.child.kill() {
            debug!(err = %e, "kill after read failure");
        }
        if let Err(e) = self.child.wait() {
            warn!(err = %e, "wait after read failure");
        }
        join_stderr(self.stderr);
    }
}

/// Feed every line of `reader` to `on_line`, trailing `\r`/`\n` removed.
///
/// Lines delivered before a read error stay delivered; the error is returned
/// as [`HarnessError::StreamRead`]. Invalid UTF-8 is replaced lossily.
pub fn stream_lines<R: Read, F: FnMut(&str)>(reader: R, on_line: &mut F) -> Result<usize> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut count = 0usize;

    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(|source| HarnessError::StreamRead { source })?;
        if n == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&buf);
        on_line(text.trim_end_matches(['\r', '\n']));
        count += 1;
    }

    Ok(count)
}

/// Map an exit status to a single integer.
///
/// A normal exit yields its code. On Unix a signal-terminated child yields the
/// negated signal number. Anything else yields `-1`.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

fn drain<R: Read>(mut reader: R) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}

fn join_stderr(handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>) -> Vec<u8> {
    let Some(handle) = handle else {
        return Vec::new();
    };
    match handle.join() {
        Ok(Ok(buf)) => buf,
        Ok(Err(e)) => {
            warn!(err = %e, "failed to drain stderr");
            Vec::new()
        }
        Err(_) => {
            warn!("stderr reader thread panicked");
            Vec::new()
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Yields `data`, then fails every later read.
    pub(crate) struct BreaksAfter {
        data: &'static [u8],
    }

    impl BreaksAfter {
        pub(crate) fn new(data: &'static [u8]) -> Self {
            Self { data }
        }
    }

    impl Read for BreaksAfter {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.data.is_empty() {
                return Err(std::io::Error::other("pipe broke"));
            }
            let n = self.data.len().min(buf.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn collect(input: &[u8]) -> Vec<String> {
        let mut seen = Vec::new();
        stream_lines(input, &mut |line: &str| seen.push(line.to_string())).expect("stream");
        seen
    }

    #[test]
    fn stream_lines_strips_terminators() {
        assert_eq!(collect(b"one\ntwo\r\nthree"), vec!["one", "two", "three"]);
    }

    #[test]
    fn stream_lines_keeps_blank_lines() {
        assert_eq!(collect(b"a\n\nb\n"), vec!["a", "", "b"]);
    }

    #[test]
    fn stream_lines_replaces_invalid_utf8() {
        assert_eq!(collect(b"ok \xff\n"), vec!["ok \u{fffd}"]);
    }

    #[test]
    fn read_error_keeps_lines_already_delivered() {
        let mut seen = Vec::new();
        let err = stream_lines(BreaksAfter::new(b"a\nb\n"), &mut |line: &str| {
            seen.push(line.to_string());
        })
        .expect_err("read should fail");

        assert!(matches!(err, HarnessError::StreamRead { .. }));
        assert_eq!(seen, vec!["a", "b"]);
    }

    #[test]
    fn missing_program_is_launch_failure() {
        let cmd = Command::new("/nonexistent/harness-test-binary");
        let err = spawn(cmd).err().expect("launch should fail");
        assert!(matches!(err, HarnessError::Launch { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn collects_stdout_and_stderr_separately() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo out; echo err >&2; exit 4");
        let mut child = spawn(cmd).expect("spawn");
        let stdout = child.take_stdout().expect("stdout piped");

        let mut lines = Vec::new();
        stream_lines(stdout, &mut |line: &str| lines.push(line.to_string())).expect("stream");
        let run = child.wait().expect("wait");

        assert_eq!(lines, vec!["out"]);
        assert_eq!(run.stderr, b"err\n");
        assert_eq!(exit_code(run.status), 4);
    }

    #[cfg(unix)]
    #[test]
    fn signal_termination_is_negated() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("kill -9 $$");
        let run = spawn(cmd).expect("spawn").wait().expect("wait");

        assert_eq!(exit_code(run.status), -9);
    }

    #[cfg(unix)]
    #[test]
    fn abort_reaps_running_child() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("exec sleep 30");
        let child = spawn(cmd).expect("spawn");
        child.abort();
    }
}
