//! Wire messages exchanged across the context boundary

use serde::{Deserialize, Serialize};
use veil_core::ScanResult;

/// Messages on the page-side channel, correlated by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    InterceptRequest {
        id: String,
        text: String,
    },
    InterceptResponse {
        id: String,
        #[serde(default)]
        result: Option<ScanResponse>,
    },
}

impl Message {
    pub fn id(&self) -> &str {
        match self {
            Message::InterceptRequest { id, .. } | Message::InterceptResponse { id, .. } => id,
        }
    }
}

/// Request handled by the privileged context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanRequest {
    ScanText { text: String },
}

/// Scan outcome as sent over the wire. `error` is only present when the
/// scan failed and the original text is being passed through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    #[serde(flatten)]
    pub result: ScanResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanResponse {
    /// Original text, no findings, and the failure that caused the fallback.
    pub fn fail_open(text: &str, error: impl Into<String>) -> Self {
        Self {
            result: ScanResult::clean(text),
            error: Some(error.into()),
        }
    }

    /// Redacted text worth writing back, if any.
    pub fn replacement(&self) -> Option<&str> {
        Some(self.result.anonymized_text.as_str()).filter(|t| !t.is_empty())
    }
}

impl From<ScanResult> for ScanResponse {
    fn from(result: ScanResult) -> Self {
        Self {
            result,
            error: None,
        }
    }
}
