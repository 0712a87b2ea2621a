//! Process-level run ID for tracking import executions.
//!
//! Each process gets a unique ULID at startup. Every year imported within
//! the same process shares this ID, enabling:
//! - Correlating a multi-year run's log lines after the fact
//! - Separating records of different runs (even on the same day)
//!
//! # Example
//! ```
//! use lp_common::run_id;
//!
//! // Get the process-level run ID (same value for entire process lifetime)
//! let id = run_id::get();
//! println!("Current run: {}", id);
//!
//! // Generate a fresh ULID for sub-tasks if needed
//! let sub_id = run_id::generate();
//! ```

use once_cell::sync::Lazy;
use ulid::Ulid;

/// Process-level run ID, generated once at first access.
static RUN_ID: Lazy<String> = Lazy::new(|| Ulid::new().to_string());

/// Returns the process-level run ID.
///
/// This ID is:
/// - Generated once per process (at first call)
/// - Time-ordered (ULIDs sort lexicographically by creation time)
/// - 26 characters, URL-safe
#[inline]
pub fn get() -> &'static str {
    &RUN_ID
}

/// Generates a fresh ULID.
///
/// Use this when a sub-operation needs its own unique ID
/// (e.g., per-year batch IDs inside one process).
#[inline]
pub fn generate() -> String {
    Ulid::new().to_string()
}
