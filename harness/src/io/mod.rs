//! I/O helpers for the harness.

pub mod config;
pub mod process;
pub mod sink;
