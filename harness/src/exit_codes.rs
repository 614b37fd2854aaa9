//! Stable exit codes for the `harness` binary.
//!
//! Scan commands exit with the scanner's own status; these codes cover the
//! harness itself.

/// Command succeeded (`serve` stopped cleanly).
pub const OK: i32 = 0;
/// Harness failure: bad config, launch failure, bind failure, etc.
pub const INVALID: i32 = 1;
