//! Scan result shared by the scanner, the engine and the wire protocol

use serde::{Deserialize, Serialize};

use crate::Violation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub has_issues: bool,
    pub anonymized_text: String,
    pub found_violations: Vec<Violation>,
}

impl ScanResult {
    /// Result for text that was not modified.
    pub fn clean(text: impl Into<String>) -> Self {
        Self {
            has_issues: false,
            anonymized_text: text.into(),
            found_violations: Vec::new(),
        }
    }
}
