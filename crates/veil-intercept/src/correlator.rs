//! Request/response correlation across the context boundary
//!
//! Each scan request gets a fresh id and a pending entry holding a oneshot
//! sender. The dispatch task resolves an entry when the first response with
//! its id arrives and removes it; later responses with that id find nothing
//! and are dropped. A request that outlives the timeout removes its own
//! entry and resolves to `None`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::channel::MessageChannel;
use crate::protocol::{Message, ScanResponse};

pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(5);

type Pending = Arc<Mutex<HashMap<String, oneshot::Sender<Option<ScanResponse>>>>>;

pub struct Correlator {
    channel: Arc<dyn MessageChannel>,
    pending: Pending,
    timeout: Duration,
    dispatch: JoinHandle<()>,
}

impl Correlator {
    /// Start listening for responses on `channel`. Must be called inside a
    /// tokio runtime.
    pub fn new(channel: Arc<dyn MessageChannel>, timeout: Duration) -> Self {
        let pending: Pending = Arc::default();
        let responses = channel.subscribe();
        let dispatch = tokio::spawn(dispatch(responses, pending.clone()));

        Self {
            channel,
            pending,
            timeout,
            dispatch,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of requests still waiting for a response.
    pub fn pending_len(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Send `text` for scanning and wait for the correlated response.
    ///
    /// Resolves to `None` on timeout, on a response without a result, or when
    /// the request could not be sent. Never fails.
    pub async fn request_scan(&self, text: &str) -> Option<ScanResponse> {
        let id = Uuid::new_v4().simple().to_string();
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(id.clone(), tx);
        // removes the entry however this call ends, cancellation included
        let _entry = PendingEntry {
            pending: &self.pending,
            id: &id,
        };

        let request = Message::InterceptRequest {
            id: id.clone(),
            text: text.to_string(),
        };
        if let Err(e) = self.channel.post(request) {
            warn!(id = %id, "failed to send scan request: {}", e);
            return None;
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                debug!(id = %id, "pending request dropped");
                None
            }
            Err(_) => {
                warn!(id = %id, "scan timed out, proceeding without anonymization");
                None
            }
        }
    }
}

struct PendingEntry<'a> {
    pending: &'a Pending,
    id: &'a str,
}

impl Drop for PendingEntry<'_> {
    fn drop(&mut self) {
        lock(self.pending).remove(self.id);
    }
}

impl Drop for Correlator {
    fn drop(&mut self) {
        self.dispatch.abort();
    }
}

async fn dispatch(mut responses: broadcast::Receiver<Message>, pending: Pending) {
    loop {
        match responses.recv().await {
            Ok(Message::InterceptResponse { id, result }) => {
                let waiter = lock(&pending).remove(&id);
                match waiter {
                    // receiver may already be gone if the timeout fired first
                    Some(tx) => {
                        let _ = tx.send(result);
                    }
                    None => debug!(id = %id, "ignoring stale or duplicate response"),
                }
            }
            Ok(Message::InterceptRequest { .. }) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "response listener lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
