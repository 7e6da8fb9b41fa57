//! Issue lifecycle and the scan-and-record workflow

pub mod error;
pub mod feed;
pub mod issues;
pub mod pipeline;

pub use error::{EngineError, Result};
pub use feed::IssueFeed;
pub use issues::{DEFAULT_DISMISS_WINDOW, IssueService};
pub use pipeline::{DEFAULT_CONTEXT_CHARS, ScanPipeline};
