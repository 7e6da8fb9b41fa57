use serde_json::Value;
use tracing::{debug, warn};

use crate::adapter::{
    AiServiceAdapter, ExtractionContext, ExtractionResult, ExtractionSource, MessagePath,
    PayloadSnapshot, RewriteContext, ServiceType,
};
use crate::dom::{Dom, ElementKind, ElementSnapshot};
use crate::error::{AdapterError, Result};

const DOMAINS: &[&str] = &["gemini.google.com", "bard.google.com"];
static SERVICE_TYPE: ServiceType = ServiceType::GEMINI;

/// Input field candidates, most specific first.
pub const INPUT_SELECTORS: &[&str] = &[
    r#"textarea[aria-label*="message"]"#,
    r#"textarea[aria-label*="Message"]"#,
    r#"textarea[placeholder*="message"]"#,
    r#"textarea[placeholder*="Message"]"#,
    r#"[contenteditable="true"][aria-label*="message"]"#,
    r#"[contenteditable="true"][aria-label*="Message"]"#,
    "textarea",
    r#"[contenteditable="true"]"#,
];

/// Reads and rewrites the Gemini prompt box directly in the page.
#[derive(Debug, Default)]
pub struct GeminiAdapter;

impl GeminiAdapter {
    pub fn new() -> Self {
        Self
    }

    /// First candidate holding non-blank text. Selectors the document
    /// rejects are skipped.
    fn find_input(&self, dom: &dyn Dom, hint: Option<&str>) -> Option<ElementSnapshot> {
        let hint = hint.map(str::trim).filter(|s| !s.is_empty());
        for selector in hint.into_iter().chain(INPUT_SELECTORS.iter().copied()) {
            match dom.query_selector(selector) {
                Ok(Some(element)) if !element.text.trim().is_empty() => return Some(element),
                Ok(_) => {}
                Err(e) => debug!(selector, "skipping selector: {}", e),
            }
        }
        None
    }
}

impl AiServiceAdapter for GeminiAdapter {
    fn service_type(&self) -> &ServiceType {
        &SERVICE_TYPE
    }

    fn supported_domains(&self) -> &[&'static str] {
        DOMAINS
    }

    fn extraction_source(&self) -> ExtractionSource {
        ExtractionSource::Dom
    }

    fn can_handle(&self, url: &str) -> bool {
        DOMAINS.iter().any(|domain| url.contains(domain))
    }

    fn extract_user_message(&self, context: &ExtractionContext<'_>) -> Result<Option<ExtractionResult>> {
        let ExtractionContext::Document { dom, selector } = context else {
            return Err(AdapterError::UnsupportedContext("expected a document"));
        };

        let Some(element) = self.find_input(*dom, *selector) else {
            debug!("no input element found with any selector");
            return Ok(None);
        };

        let message = element.text.trim().to_string();
        Ok(Some(ExtractionResult {
            user_message: Some(message),
            message_path: MessagePath::Selector(element.locator()),
            payload: PayloadSnapshot::Element(element),
        }))
    }

    fn update_payload(&self, context: &RewriteContext<'_>, anonymized_text: &str) -> Result<Option<Value>> {
        let Some(dom) = context.dom else {
            return Err(AdapterError::UnsupportedContext("expected a document"));
        };
        let MessagePath::Selector(selector) = &context.extraction.message_path else {
            return Err(AdapterError::UnsupportedContext("expected a selector"));
        };

        let Some(element) = dom.query_selector(selector)? else {
            warn!(selector = %selector, "input element is gone, skipping rewrite");
            return Ok(None);
        };

        match element.kind {
            ElementKind::TextArea | ElementKind::Input => dom.set_value(selector, anonymized_text)?,
            ElementKind::ContentEditable | ElementKind::Other => {
                dom.set_text_content(selector, anonymized_text)?
            }
        }
        dom.dispatch_input(selector)?;

        debug!(selector = %selector, "updated input element with anonymized text");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DomEvent, MemoryDom};

    fn extract(dom: &MemoryDom, hint: Option<&str>) -> Option<ExtractionResult> {
        GeminiAdapter
            .extract_user_message(&ExtractionContext::Document { dom, selector: hint })
            .unwrap()
    }

    #[test]
    fn test_can_handle() {
        let adapter = GeminiAdapter::new();
        assert!(adapter.can_handle("https://gemini.google.com/app/123"));
        assert!(adapter.can_handle("https://bard.google.com/"));
        assert!(!adapter.can_handle("https://chatgpt.com/"));
    }

    #[test]
    fn test_prefers_labelled_textarea() {
        let dom = MemoryDom::new()
            .with_element(ElementSnapshot::new("textarea", ElementKind::TextArea).with_text("draft"))
            .with_element(
                ElementSnapshot::new("textarea", ElementKind::TextArea)
                    .with_aria_label("Enter a prompt message")
                    .with_text("  mail a@b.io \n"),
            );

        let result = extract(&dom, None).unwrap();
        assert_eq!(result.message(), Some("mail a@b.io"));
        assert_eq!(
            result.message_path,
            MessagePath::Selector("[aria-label=\"Enter a prompt message\"]".to_string())
        );
    }

    #[test]
    fn test_skips_empty_candidates() {
        let dom = MemoryDom::new()
            .with_element(
                ElementSnapshot::new("textarea", ElementKind::TextArea).with_aria_label("message"),
            )
            .with_element(
                ElementSnapshot::new("div", ElementKind::ContentEditable)
                    .with_class("ql-editor textarea")
                    .with_text("call +1234567890"),
            );

        let result = extract(&dom, None).unwrap();
        assert_eq!(result.message(), Some("call +1234567890"));
        assert_eq!(result.message_path, MessagePath::Selector(".ql-editor".to_string()));

        assert!(extract(&MemoryDom::new(), None).is_none());
    }

    #[test]
    fn test_selector_hint_probed_first() {
        let dom = MemoryDom::new()
            .with_element(ElementSnapshot::new("textarea", ElementKind::TextArea).with_text("generic"))
            .with_element(
                ElementSnapshot::new("input", ElementKind::Input)
                    .with_id("prompt")
                    .with_text("hinted"),
            );

        assert_eq!(extract(&dom, Some("#prompt")).unwrap().message(), Some("hinted"));
        // an unusable hint falls through to the defaults
        assert_eq!(extract(&dom, Some("div > p")).unwrap().message(), Some("generic"));
        assert_eq!(extract(&dom, Some("   ")).unwrap().message(), Some("generic"));
    }

    #[test]
    fn test_rewrite_sets_text_and_notifies() {
        let dom = MemoryDom::new().with_element(
            ElementSnapshot::new("div", ElementKind::ContentEditable)
                .with_id("editor")
                .with_text("mail a@b.io"),
        );
        let extraction = extract(&dom, None).unwrap();
        let context = RewriteContext {
            extraction: &extraction,
            dom: Some(&dom),
        };

        let out = GeminiAdapter.update_payload(&context, "mail [EMAIL_ADDRESS]").unwrap();
        assert!(out.is_none());
        assert_eq!(dom.text_of("#editor").as_deref(), Some("mail [EMAIL_ADDRESS]"));
        assert_eq!(
            dom.events(),
            vec![
                DomEvent::TextSet {
                    selector: "#editor".to_string(),
                    text: "mail [EMAIL_ADDRESS]".to_string()
                },
                DomEvent::Input {
                    selector: "#editor".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_rewrite_form_control_uses_value() {
        let dom = MemoryDom::new().with_element(
            ElementSnapshot::new("textarea", ElementKind::TextArea)
                .with_placeholder("Ask Gemini")
                .with_text("10.0.0.1"),
        );
        let extraction = extract(&dom, None).unwrap();
        let context = RewriteContext {
            extraction: &extraction,
            dom: Some(&dom),
        };

        GeminiAdapter.update_payload(&context, "[IP_ADDRESS]").unwrap();
        assert!(matches!(dom.events()[0], DomEvent::ValueSet { .. }));
        assert_eq!(dom.text_of("textarea").as_deref(), Some("[IP_ADDRESS]"));
    }

    #[test]
    fn test_rewrite_without_element_is_noop() {
        let dom = MemoryDom::new();
        let extraction = ExtractionResult {
            user_message: Some("x".to_string()),
            message_path: MessagePath::Selector("#gone".to_string()),
            payload: PayloadSnapshot::Element(ElementSnapshot::new("textarea", ElementKind::TextArea)),
        };
        let context = RewriteContext {
            extraction: &extraction,
            dom: Some(&dom),
        };

        assert!(GeminiAdapter.update_payload(&context, "y").unwrap().is_none());
        assert!(dom.events().is_empty());
    }
}
