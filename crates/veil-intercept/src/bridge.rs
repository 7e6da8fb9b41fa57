//! Relay between the page-side channel and the privileged scan handler

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use veil_core::Violation;
use veil_engine::ScanPipeline;

use crate::channel::MessageChannel;
use crate::protocol::{Message, ScanResponse};

/// Handles `SCAN_TEXT` in the privileged context. Implementations never
/// fail: errors come back as a pass-through response carrying `error`.
#[async_trait]
pub trait ScanBackend: Send + Sync {
    async fn scan_text(&self, text: &str) -> ScanResponse;
}

#[async_trait]
impl ScanBackend for ScanPipeline {
    async fn scan_text(&self, text: &str) -> ScanResponse {
        match self.execute(text).await {
            Ok(result) => result.into(),
            Err(e) => {
                error!("Scan failed: {}", e);
                ScanResponse::fail_open(text, e.to_string())
            }
        }
    }
}

/// Published whenever a relayed scan found something.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub request_id: String,
    pub violations: Vec<Violation>,
}

pub struct ScanBridge {
    backend: Arc<dyn ScanBackend>,
    channel: Arc<dyn MessageChannel>,
    detections: broadcast::Sender<Detection>,
}

impl ScanBridge {
    pub fn new(backend: Arc<dyn ScanBackend>, channel: Arc<dyn MessageChannel>) -> Self {
        let (detections, _) = broadcast::channel(16);
        Self {
            backend,
            channel,
            detections,
        }
    }

    /// Notices for surfaces that show findings to the user.
    pub fn detections(&self) -> broadcast::Receiver<Detection> {
        self.detections.subscribe()
    }

    /// Answer `INTERCEPT_REQUEST`s until the channel closes. Each request is
    /// handled on its own task.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        let mut requests = self.channel.subscribe();
        tokio::spawn(async move {
            loop {
                match requests.recv().await {
                    Ok(Message::InterceptRequest { id, text }) => {
                        let bridge = self.clone();
                        tokio::spawn(async move { bridge.handle_request(id, &text).await });
                    }
                    Ok(Message::InterceptResponse { .. }) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "request listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    pub async fn handle_request(&self, id: String, text: &str) {
        debug!(id = %id, "scan requested");
        let response = self.backend.scan_text(text).await;

        let detection = response.result.has_issues.then(|| Detection {
            request_id: id.clone(),
            violations: response.result.found_violations.clone(),
        });

        let reply = Message::InterceptResponse {
            id,
            result: Some(response),
        };
        if let Err(e) = self.channel.post(reply) {
            warn!("failed to reply to scan request: {}", e);
        }

        if let Some(detection) = detection {
            info!(count = detection.violations.len(), "sensitive content detected");
            // nobody listening is fine
            let _ = self.detections.send(detection);
        }
    }
}
