//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline future (validate → fetch → render)
//!     → timeouts.rs (race against the configured deadline)
//!     → result, or Timeout with the future dropped
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; the whole request chain has one deadline
//! - Nothing is retried: upstream pages are fetched once, renders run once

pub mod timeouts;

pub use timeouts::with_deadline;
