//! Destinations for live scanner output.
//!
//! The runner always keeps its own capture buffer; a sink only decides where
//! the live copy goes while the child is running.

use std::sync::{Arc, Mutex, PoisonError};

/// Receives each stdout line as it arrives and the exit status once the child
/// has terminated.
pub trait OutputSink: Send {
    /// Called once per stdout line, terminators already stripped.
    fn line(&mut self, line: &str);
    fn exit_status(&mut self, code: i32);
}

/// Echoes scanner output to the harness's own stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl OutputSink for ConsoleSink {
    fn line(&mut self, line: &str) {
        println!("{line}");
    }

    fn exit_status(&mut self, code: i32) {
        println!("Return code {code}");
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn line(&mut self, _line: &str) {}

    fn exit_status(&mut self, _code: i32) {}
}

#[derive(Debug, Default)]
struct Recorded {
    lines: Vec<String>,
    exit_statuses: Vec<i32>,
}

/// Records everything in memory.
///
/// Clones share the same buffer, so a test can hand one clone to the runner
/// and inspect another.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    inner: Arc<Mutex<Recorded>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lock().lines.clone()
    }

    pub fn exit_statuses(&self) -> Vec<i32> {
        self.lock().exit_statuses.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OutputSink for MemorySink {
    fn line(&mut self, line: &str) {
        self.lock().lines.push(line.to_string());
    }

    fn exit_status(&mut self, code: i32) {
        self.lock().exit_statuses.push(code);
    }
}
