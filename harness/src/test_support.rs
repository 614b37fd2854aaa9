//! Test-only helpers: throwaway stand-ins for the scanner binary.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// An executable shell script in its own temp directory.
///
/// The directory (and script) are removed when the stub is dropped.
pub struct StubBinary {
    _dir: TempDir,
    path: PathBuf,
}

impl StubBinary {
    /// Create a stub whose body is run by `/bin/sh`.
    #[cfg(unix)]
    pub fn new(body: &str) -> io::Result<Self> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scanner");
        fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        Ok(Self { _dir: dir, path })
    }

    /// Prints each received argument on its own line and exits 0.
    #[cfg(unix)]
    pub fn echo_args() -> io::Result<Self> {
        Self::new("printf '%s\\n' \"$@\"")
    }

    /// Prints `lines` to stdout, a marker to stderr, then exits with `code`.
    #[cfg(unix)]
    pub fn printing(lines: &[&str], code: i32) -> io::Result<Self> {
        let mut body = String::new();
        for line in lines {
            body.push_str(&format!("printf '%s\\n' '{line}'\n"));
        }
        body.push_str("echo 'stub stderr' >&2\n");
        body.push_str(&format!("exit {code}"));
        Self::new(&body)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
