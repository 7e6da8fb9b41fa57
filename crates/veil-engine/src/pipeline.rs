use std::sync::Arc;

use tracing::{debug, info};
use veil_core::ScanResult;
use veil_scanner::Scanner;

use crate::{IssueService, Result};

/// Characters of the scanned text kept as an issue's context snippet.
pub const DEFAULT_CONTEXT_CHARS: usize = 100;

/// Scan-and-record workflow run in the privileged context.
pub struct ScanPipeline {
    scanner: Arc<Scanner>,
    issues: Arc<IssueService>,
    context_chars: usize,
}

impl ScanPipeline {
    pub fn new(scanner: Arc<Scanner>, issues: Arc<IssueService>) -> Self {
        Self {
            scanner,
            issues,
            context_chars: DEFAULT_CONTEXT_CHARS,
        }
    }

    pub fn with_context_chars(mut self, chars: usize) -> Self {
        self.context_chars = chars;
        self
    }

    pub fn issues(&self) -> &Arc<IssueService> {
        &self.issues
    }

    /// Scan `text` against everything not currently dismissed and record each
    /// finding. Blank text is returned untouched without reading storage.
    pub async fn execute(&self, text: &str) -> Result<ScanResult> {
        if text.trim().is_empty() {
            return Ok(ScanResult::clean(text));
        }

        let dismissed = self.issues.get_dismissed_violations().await?;
        let result = self.scanner.scan_and_anonymize(text, &dismissed);

        if result.has_issues {
            let snippet = context_snippet(text, self.context_chars);
            for violation in &result.found_violations {
                if !self.issues.add_issue(violation, Some(&snippet)).await? {
                    debug!(kind = %violation.kind, "finding already tracked");
                }
            }
            info!(
                count = result.found_violations.len(),
                "redacted sensitive content"
            );
        }

        Ok(result)
    }
}

fn context_snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
