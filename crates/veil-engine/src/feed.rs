//! Live view of the issue record for display surfaces

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::warn;
use veil_core::IssueState;

use crate::IssueService;

/// Republishes the full issue record whenever the store reports a change to
/// the issues key. The record is always re-fetched whole.
pub struct IssueFeed {
    state: watch::Receiver<IssueState>,
    task: JoinHandle<()>,
}

impl IssueFeed {
    /// Load the current record and start following changes.
    pub async fn spawn(service: Arc<IssueService>) -> Self {
        // Subscribe before the initial load so no change slips in between
        let mut changes = service.subscribe();
        let initial = service.get_all_issues().await.unwrap_or_else(|e| {
            warn!("Initial issue load failed: {}", e);
            IssueState::empty()
        });
        let (tx, state) = watch::channel(initial);

        let task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(key) if key != service.storage_key() => continue,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }

                match service.get_all_issues().await {
                    Ok(issues) => {
                        if tx.send(issues).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Failed to refresh issues: {}", e),
                }
            }
        });

        Self { state, task }
    }

    pub fn current(&self) -> IssueState {
        self.state.borrow().clone()
    }

    /// Wait for the next refresh and return it.
    pub async fn changed(&mut self) -> Option<IssueState> {
        self.state.changed().await.ok()?;
        Some(self.state.borrow_and_update().clone())
    }
}

impl Drop for IssueFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_core::{Violation, ViolationKind};
    use veil_storage::{KeyValueStore, MemoryStore, StoreIssueRepository};

    #[tokio::test]
    async fn test_feed_follows_issue_changes() {
        let store = Arc::new(MemoryStore::new());
        let repo = StoreIssueRepository::new(store.clone());
        let service = Arc::new(IssueService::new(Arc::new(repo)));

        let mut feed = IssueFeed::spawn(service.clone()).await;
        assert!(feed.current().active_issues.is_empty());

        // unrelated keys do not trigger a refresh
        store.set("other", serde_json::json!(1)).await.unwrap();

        let violation = Violation::new(ViolationKind::EMAIL_ADDRESS, "a@b.io");
        service.add_issue(&violation, None).await.unwrap();

        let refreshed = feed.changed().await.unwrap();
        assert_eq!(refreshed.active_issues.len(), 1);
        assert_eq!(feed.current().active_issues[0].id, violation.id);
    }
}
