//! AI service adapter trait

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::dom::{Dom, ElementSnapshot};

/// Identifies the AI service an adapter targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceType(Cow<'static, str>);

impl ServiceType {
    pub const CHATGPT: ServiceType = ServiceType(Cow::Borrowed("CHATGPT"));
    pub const GEMINI: ServiceType = ServiceType(Cow::Borrowed("GEMINI"));

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an adapter captures the user's message from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtractionSource {
    /// Structured request bodies of outbound network calls
    Network,
    /// Live input elements of the page
    Dom,
}

/// One step into a JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

/// Locator of the extracted message, opaque to everything but the adapter
/// that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePath {
    Json(Vec<PathSegment>),
    Selector(String),
}

/// Snapshot taken at extraction time, sufficient for the later rewrite.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadSnapshot {
    Json(serde_json::Value),
    Element(ElementSnapshot),
}

/// Output of one extraction attempt. Consumed by the matching
/// [`AiServiceAdapter::update_payload`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub user_message: Option<String>,
    pub message_path: MessagePath,
    pub payload: PayloadSnapshot,
}

impl ExtractionResult {
    /// The extracted message, if present and not blank.
    pub fn message(&self) -> Option<&str> {
        self.user_message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
    }
}

/// Input an adapter extracts from.
#[derive(Clone, Copy)]
pub enum ExtractionContext<'a> {
    /// Raw outbound request body
    Body(&'a str),
    /// The live page, with an optional selector to probe first
    Document {
        dom: &'a dyn Dom,
        selector: Option<&'a str>,
    },
}

/// Input an adapter rewrites into.
#[derive(Clone, Copy)]
pub struct RewriteContext<'a> {
    pub extraction: &'a ExtractionResult,
    pub dom: Option<&'a dyn Dom>,
}

/// Normalizes extraction and rewrite of the user's message for one service.
pub trait AiServiceAdapter: Send + Sync {
    fn service_type(&self) -> &ServiceType;

    /// Hostnames this adapter is indexed under.
    fn supported_domains(&self) -> &[&'static str];

    fn extraction_source(&self) -> ExtractionSource;

    fn can_handle(&self, url: &str) -> bool;

    /// Locate the user's message. `Ok(None)` when there is none.
    fn extract_user_message(&self, context: &ExtractionContext<'_>) -> Result<Option<ExtractionResult>>;

    /// Write `anonymized_text` back.
    ///
    /// Network adapters return a rewritten copy of the payload; DOM adapters
    /// mutate the page and return `None`.
    fn update_payload(
        &self,
        context: &RewriteContext<'_>,
        anonymized_text: &str,
    ) -> Result<Option<serde_json::Value>>;
}
