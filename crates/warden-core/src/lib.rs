//! Foundational low-level utilities shared across warden crates.
//!
//! Provides the atomic file write used by the attachment store, plus the
//! timestamp helpers every time-fenced decision is built on.

pub mod atomic_io;
pub mod time_utils;

pub use atomic_io::write_bytes_atomic;
pub use time_utils::{current_unix_timestamp_ms, parse_rfc3339_utc};
