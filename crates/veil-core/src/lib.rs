//! Core domain models for veil
//!
//! This crate contains:
//! - Domain models (Violation, IssueState)
//! - The scan result shape shared by the scanner, the engine and the wire protocol
//! - Timestamp helpers with millisecond precision

pub mod error;
pub mod issue;
pub mod scan;
pub mod violation;

pub use error::{Error, Result};
pub use issue::{IssueState, ISSUES_KEY};
pub use scan::ScanResult;
pub use violation::{Violation, ViolationKind, now_millis};
