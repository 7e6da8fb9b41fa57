//! Issue repository: whole-record access to the persisted issue state

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::error;
use veil_core::{ISSUES_KEY, IssueState, Violation, now_millis};

use crate::{KeyValueStore, Result, StorageError};

/// Load/save of the complete issue record. No partial writes.
#[async_trait]
pub trait IssueRepository: Send + Sync {
    fn storage_key(&self) -> &str;

    async fn get_issues(&self) -> Result<IssueState>;

    async fn save_issues(&self, issues: &IssueState) -> Result<()>;

    /// Change feed of the underlying store, carrying changed keys.
    fn subscribe(&self) -> broadcast::Receiver<String>;

    async fn find_violation_by_id(&self, id: &str) -> Result<Option<Violation>> {
        Ok(self.get_issues().await?.find_by_id(id).cloned())
    }

    async fn find_active_violation_by_payload(&self, payload: &str) -> Result<Option<Violation>> {
        let issues = self.get_issues().await?;
        Ok(issues.find_active_by_payload(payload, now_millis()).cloned())
    }

    async fn get_dismissed_violations(&self) -> Result<Vec<Violation>> {
        Ok(self.get_issues().await?.dismissed_at(now_millis()))
    }
}

/// Repository over any [`KeyValueStore`], keeping the record under [`ISSUES_KEY`].
pub struct StoreIssueRepository {
    store: Arc<dyn KeyValueStore>,
}

impl StoreIssueRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IssueRepository for StoreIssueRepository {
    fn storage_key(&self) -> &str {
        ISSUES_KEY
    }

    async fn get_issues(&self) -> Result<IssueState> {
        let value = self.store.get(ISSUES_KEY).await.inspect_err(|e| {
            error!("Failed to get issues from storage: {}", e);
        })?;

        IssueState::from_value(value).map_err(|source| {
            error!("Stored issue record is unreadable: {}", source);
            StorageError::Corrupt {
                key: ISSUES_KEY.to_string(),
                source,
            }
        })
    }

    async fn save_issues(&self, issues: &IssueState) -> Result<()> {
        let value = issues.to_value().map_err(|source| StorageError::Corrupt {
            key: ISSUES_KEY.to_string(),
            source,
        })?;

        self.store.set(ISSUES_KEY, value).await.inspect_err(|e| {
            error!("Failed to save issues to storage: {}", e);
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.store.subscribe()
    }
}
