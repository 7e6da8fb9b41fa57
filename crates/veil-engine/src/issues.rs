use std::sync::Arc;

use time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};
use veil_core::{IssueState, Violation, now_millis};
use veil_storage::IssueRepository;

use crate::{EngineError, Result};

/// How long a dismissed payload stays suppressed.
pub const DEFAULT_DISMISS_WINDOW: Duration = Duration::hours(24);

/// Business rules over the persisted issue record.
///
/// Every operation is a whole-record read-modify-write with no versioning;
/// concurrent writers race and the last write wins.
pub struct IssueService {
    repository: Arc<dyn IssueRepository>,
    dismiss_window: Duration,
}

impl IssueService {
    pub fn new(repository: Arc<dyn IssueRepository>) -> Self {
        Self {
            repository,
            dismiss_window: DEFAULT_DISMISS_WINDOW,
        }
    }

    pub fn with_dismiss_window(mut self, window: Duration) -> Self {
        self.dismiss_window = window;
        self
    }

    pub fn storage_key(&self) -> &str {
        self.repository.storage_key()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.repository.subscribe()
    }

    /// Record `violation` unless an entry with the same payload is currently
    /// active. Returns whether a new entry was written.
    ///
    /// Bounding the length of `context` is up to the caller.
    pub async fn add_issue(&self, violation: &Violation, context: Option<&str>) -> Result<bool> {
        let mut issues = self.repository.get_issues().await?;

        if issues
            .find_active_by_payload(&violation.payload, now_millis())
            .is_some()
        {
            debug!(kind = %violation.kind, "issue already active, skipping");
            return Ok(false);
        }

        let entry = violation
            .clone()
            .with_context(context.map(str::to_string));
        issues.record(entry);

        self.repository.save_issues(&issues).await?;
        Ok(true)
    }

    /// Suppress the issue with `id` until now plus the dismiss window.
    pub async fn dismiss_issue(&self, id: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(EngineError::Validation("Issue ID is required".to_string()));
        }

        let mut issues = self.repository.get_issues().await?;
        let until = now_millis() + self.dismiss_window;
        let replaced = issues.dismiss(id, until);

        info!(id, replaced, "dismissed issue");
        self.repository.save_issues(&issues).await?;
        Ok(())
    }

    pub async fn get_active_issues(&self) -> Result<Vec<Violation>> {
        Ok(self.repository.get_issues().await?.active_at(now_millis()))
    }

    /// Currently dismissed history entries, used to suppress re-detection.
    pub async fn get_dismissed_violations(&self) -> Result<Vec<Violation>> {
        Ok(self.repository.get_dismissed_violations().await?)
    }

    pub async fn get_all_issues(&self) -> Result<IssueState> {
        Ok(self.repository.get_issues().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_core::ViolationKind;
    use veil_storage::{MemoryStore, StoreIssueRepository};

    fn service() -> IssueService {
        let repo = StoreIssueRepository::new(Arc::new(MemoryStore::new()));
        IssueService::new(Arc::new(repo))
    }

    #[tokio::test]
    async fn test_add_issue_once_per_active_payload() {
        let service = service();
        let first = Violation::new(ViolationKind::EMAIL_ADDRESS, "a@b.io");
        let second = Violation::new(ViolationKind::EMAIL_ADDRESS, "a@b.io");

        assert!(service.add_issue(&first, Some("snippet")).await.unwrap());
        assert!(!service.add_issue(&second, None).await.unwrap());

        let state = service.get_all_issues().await.unwrap();
        assert_eq!(state.active_issues.len(), 1);
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.active_issues[0].id, first.id);
        assert_eq!(state.active_issues[0].context.as_deref(), Some("snippet"));
    }

    #[tokio::test]
    async fn test_add_after_dismiss_expired() {
        let service = service().with_dismiss_window(Duration::milliseconds(-1000));
        let first = Violation::new(ViolationKind::EMAIL_ADDRESS, "a@b.io");
        service.add_issue(&first, None).await.unwrap();
        service.dismiss_issue(&first.id).await.unwrap();

        // dismissal already lapsed, so the old entry is active again
        let again = Violation::new(ViolationKind::EMAIL_ADDRESS, "a@b.io");
        assert!(!service.add_issue(&again, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_add_while_dismissed_records_new_entry() {
        let service = service();
        let first = Violation::new(ViolationKind::EMAIL_ADDRESS, "a@b.io");
        service.add_issue(&first, None).await.unwrap();
        service.dismiss_issue(&first.id).await.unwrap();

        let again = Violation::new(ViolationKind::EMAIL_ADDRESS, "a@b.io");
        assert!(service.add_issue(&again, None).await.unwrap());

        let active = service.get_active_issues().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, again.id);
    }

    #[tokio::test]
    async fn test_dismiss_sets_window_on_both_sequences() {
        let service = service();
        let target = Violation::new(ViolationKind::EMAIL_ADDRESS, "a@b.io");
        let other = Violation::new(ViolationKind::PHONE_NUMBER, "5551234");
        service.add_issue(&target, None).await.unwrap();
        service.add_issue(&other, None).await.unwrap();
        let before = service.get_all_issues().await.unwrap();

        let call_time = now_millis();
        service.dismiss_issue(&target.id).await.unwrap();

        let after = service.get_all_issues().await.unwrap();
        let expected = call_time + Duration::hours(24);
        for entry in [&after.active_issues[0], &after.history[0]] {
            let until = entry.dismissed_until.unwrap();
            assert!((until - expected).abs() < Duration::seconds(1));
        }
        assert_eq!(after.active_issues[1], before.active_issues[1]);
        assert_eq!(after.history[1], before.history[1]);

        let active = service.get_active_issues().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, other.id);

        let dismissed = service.get_dismissed_violations().await.unwrap();
        assert_eq!(dismissed.len(), 1);
        assert_eq!(dismissed[0].id, target.id);
    }

    #[tokio::test]
    async fn test_dismiss_rejects_blank_id() {
        let service = service();
        assert!(matches!(
            service.dismiss_issue("   ").await,
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            service.dismiss_issue("").await,
            Err(EngineError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_active_filter_past_dismissal() {
        let repo = Arc::new(StoreIssueRepository::new(Arc::new(MemoryStore::new())));
        let now = now_millis();
        let mut state = IssueState::empty();
        state.record(Violation::new(ViolationKind::URL, "http://a.io"));
        state.record(
            Violation::new(ViolationKind::URL, "http://b.io")
                .with_dismissed_until(now - Duration::hours(1)),
        );
        state.record(
            Violation::new(ViolationKind::URL, "http://c.io")
                .with_dismissed_until(now + Duration::hours(1)),
        );
        repo.save_issues(&state).await.unwrap();

        let service = IssueService::new(repo);
        let payloads: Vec<_> = service
            .get_active_issues()
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.payload)
            .collect();
        assert_eq!(payloads, vec!["http://a.io", "http://b.io"]);
    }
}
