//! Interception of outbound network calls

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use veil_adapters::{AiServiceAdapter, ExtractionContext, RewriteContext};

use crate::correlator::Correlator;

/// An outbound call as seen by the interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub url: String,
    pub method: String,
    pub body: Option<String>,
}

impl OutboundRequest {
    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "POST".to_string(),
            body: Some(body.into()),
        }
    }
}

/// The underlying transport being wrapped.
#[async_trait]
pub trait Fetch: Send + Sync {
    type Response: Send;

    async fn fetch(&self, request: OutboundRequest) -> Self::Response;
}

/// Wraps a [`Fetch`] so request bodies are scanned and redacted before they
/// are sent. Every call is independent; failures anywhere on the way send
/// the original request.
pub struct InterceptedFetch<F> {
    inner: F,
    adapter: Arc<dyn AiServiceAdapter>,
    correlator: Arc<Correlator>,
}

impl<F: Fetch> InterceptedFetch<F> {
    pub fn new(inner: F, adapter: Arc<dyn AiServiceAdapter>, correlator: Arc<Correlator>) -> Self {
        Self {
            inner,
            adapter,
            correlator,
        }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    pub async fn fetch(&self, request: OutboundRequest) -> F::Response {
        let request = self.prepare(request).await;
        self.inner.fetch(request).await
    }

    /// The request that should actually be sent.
    pub async fn prepare(&self, mut request: OutboundRequest) -> OutboundRequest {
        let Some(body) = request.body.as_deref() else {
            return request;
        };
        if !self.adapter.can_handle(&request.url) {
            return request;
        }

        let extraction = match self
            .adapter
            .extract_user_message(&ExtractionContext::Body(body))
        {
            Ok(Some(extraction)) => extraction,
            Ok(None) => {
                debug!(service = %self.adapter.service_type(), "no user message in request");
                return request;
            }
            Err(e) => {
                warn!(url = %request.url, "extraction failed: {}", e);
                return request;
            }
        };
        let Some(message) = extraction.message() else {
            return request;
        };

        let Some(response) = self.correlator.request_scan(message).await else {
            return request;
        };
        let Some(replacement) = response.replacement() else {
            return request;
        };
        if replacement == message {
            return request;
        }

        let context = RewriteContext {
            extraction: &extraction,
            dom: None,
        };
        match self.adapter.update_payload(&context, replacement) {
            Ok(Some(payload)) => match serde_json::to_string(&payload) {
                Ok(rewritten) => {
                    info!(service = %self.adapter.service_type(), "request body anonymized");
                    request.body = Some(rewritten);
                }
                Err(e) => warn!("failed to encode rewritten body: {}", e),
            },
            Ok(None) => {}
            Err(e) => warn!(url = %request.url, "rewrite failed: {}", e),
        }

        request
    }
}
