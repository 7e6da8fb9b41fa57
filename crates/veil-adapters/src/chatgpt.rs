use serde_json::Value;
use tracing::debug;

use crate::adapter::{
    AiServiceAdapter, ExtractionContext, ExtractionResult, ExtractionSource, MessagePath,
    PathSegment, PayloadSnapshot, RewriteContext, ServiceType,
};
use crate::error::{AdapterError, Result};

const DOMAINS: &[&str] = &["chatgpt.com", "chat.openai.com"];
const ENDPOINT_PATTERNS: &[&str] = &["/conversation"];
static SERVICE_TYPE: ServiceType = ServiceType::CHATGPT;

/// Extracts the user's prompt from ChatGPT conversation requests.
#[derive(Debug, Default)]
pub struct ChatGptAdapter;

impl ChatGptAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn is_user_message(message: &Value) -> bool {
    message.get("role").and_then(Value::as_str) == Some("user")
        || message.pointer("/author/role").and_then(Value::as_str) == Some("user")
}

/// First string part of a user message with a non-empty `content.parts` list.
fn first_part(message: &Value) -> Option<&str> {
    if !is_user_message(message) {
        return None;
    }
    let parts = message.get("content")?.get("parts")?.as_array()?;
    parts.first()?.as_str()
}

impl AiServiceAdapter for ChatGptAdapter {
    fn service_type(&self) -> &ServiceType {
        &SERVICE_TYPE
    }

    fn supported_domains(&self) -> &[&'static str] {
        DOMAINS
    }

    fn extraction_source(&self) -> ExtractionSource {
        ExtractionSource::Network
    }

    fn can_handle(&self, url: &str) -> bool {
        ENDPOINT_PATTERNS.iter().any(|pattern| url.contains(pattern))
    }

    fn extract_user_message(&self, context: &ExtractionContext<'_>) -> Result<Option<ExtractionResult>> {
        let ExtractionContext::Body(body) = context else {
            return Err(AdapterError::UnsupportedContext("expected a request body"));
        };

        let payload: Value = serde_json::from_str(body)?;
        let Some(messages) = payload.get("messages").and_then(Value::as_array) else {
            return Ok(None);
        };

        for (index, message) in messages.iter().enumerate() {
            if let Some(text) = first_part(message) {
                let path = vec![
                    PathSegment::Key("messages".to_string()),
                    PathSegment::Index(index),
                    PathSegment::Key("content".to_string()),
                    PathSegment::Key("parts".to_string()),
                    PathSegment::Index(0),
                ];
                return Ok(Some(ExtractionResult {
                    user_message: Some(text.to_string()),
                    message_path: MessagePath::Json(path),
                    payload: PayloadSnapshot::Json(payload.clone()),
                }));
            }
        }

        Ok(None)
    }

    fn update_payload(&self, context: &RewriteContext<'_>, anonymized_text: &str) -> Result<Option<Value>> {
        let extraction = context.extraction;
        let (MessagePath::Json(path), PayloadSnapshot::Json(payload)) =
            (&extraction.message_path, &extraction.payload)
        else {
            return Err(AdapterError::UnsupportedContext("expected a JSON extraction"));
        };

        let mut updated = payload.clone();
        let mut target = Some(&mut updated);
        for segment in path {
            target = target.and_then(|node| match segment {
                PathSegment::Index(i) => node.get_mut(*i),
                PathSegment::Key(key) => node.get_mut(key.as_str()),
            });
        }

        match target {
            Some(leaf) => {
                *leaf = Value::String(anonymized_text.to_string());
                Ok(Some(updated))
            }
            None => {
                debug!("message path no longer resolves, leaving payload unchanged");
                Ok(Some(payload.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(body: &Value) -> Option<ExtractionResult> {
        ChatGptAdapter
            .extract_user_message(&ExtractionContext::Body(&body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_can_handle() {
        let adapter = ChatGptAdapter::new();
        assert!(adapter.can_handle("https://chatgpt.com/backend-api/conversation"));
        assert!(adapter.can_handle("https://chat.openai.com/backend-api/conversation/abc"));
        assert!(!adapter.can_handle("https://chatgpt.com/backend-api/models"));
    }

    #[test]
    fn test_extracts_first_user_message() {
        let body = json!({
            "action": "next",
            "messages": [
                {"author": {"role": "system"}, "content": {"parts": ["ignored"]}},
                {"author": {"role": "user"}, "content": {"content_type": "text", "parts": ["mail a@b.io"]}},
                {"role": "user", "content": {"parts": ["later"]}}
            ]
        });

        let result = extract(&body).unwrap();
        assert_eq!(result.message(), Some("mail a@b.io"));
        assert_eq!(
            result.message_path,
            MessagePath::Json(vec![
                PathSegment::Key("messages".to_string()),
                PathSegment::Index(1),
                PathSegment::Key("content".to_string()),
                PathSegment::Key("parts".to_string()),
                PathSegment::Index(0),
            ])
        );
    }

    #[test]
    fn test_skips_non_text_parts() {
        let body = json!({
            "messages": [
                {"role": "user", "content": {"parts": [{"asset_pointer": "file-1"}]}},
                {"role": "user", "content": {"parts": []}},
                {"role": "user", "content": {"parts": ["second"]}}
            ]
        });
        assert_eq!(extract(&body).unwrap().message(), Some("second"));

        assert!(extract(&json!({"messages": []})).is_none());
        assert!(extract(&json!({"prompt": "x"})).is_none());
    }

    #[test]
    fn test_invalid_body() {
        let result = ChatGptAdapter.extract_user_message(&ExtractionContext::Body("not json"));
        assert!(matches!(result, Err(AdapterError::InvalidPayload(_))));
    }

    #[test]
    fn test_rewrites_leaf_only() {
        let body = json!({
            "model": "auto",
            "messages": [{"role": "user", "content": {"parts": ["mail a@b.io", "extra"]}}]
        });
        let extraction = extract(&body).unwrap();
        let context = RewriteContext {
            extraction: &extraction,
            dom: None,
        };

        let updated = ChatGptAdapter
            .update_payload(&context, "mail [EMAIL_ADDRESS]")
            .unwrap()
            .unwrap();
        assert_eq!(
            updated,
            json!({
                "model": "auto",
                "messages": [{"role": "user", "content": {"parts": ["mail [EMAIL_ADDRESS]", "extra"]}}]
            })
        );
    }

    #[test]
    fn test_missing_segment_returns_payload_unchanged() {
        let payload = json!({"messages": []});
        let extraction = ExtractionResult {
            user_message: Some("x".to_string()),
            message_path: MessagePath::Json(vec![
                PathSegment::Key("messages".to_string()),
                PathSegment::Index(3),
            ]),
            payload: PayloadSnapshot::Json(payload.clone()),
        };
        let context = RewriteContext {
            extraction: &extraction,
            dom: None,
        };

        let updated = ChatGptAdapter.update_payload(&context, "y").unwrap();
        assert_eq!(updated, Some(payload));
    }
}
