//! Issue state domain model

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Result, Violation};

/// Storage key the whole issue record lives under.
pub const ISSUES_KEY: &str = "anonymizer_issues";

/// Aggregate record of findings.
///
/// Every recorded violation is appended to both sequences once; dismissal
/// replaces entries by id in both sequences in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueState {
    #[serde(default)]
    pub active_issues: Vec<Violation>,
    #[serde(default)]
    pub history: Vec<Violation>,
}

impl IssueState {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rebuild a state from its stored JSON form. A missing record is the empty state.
    pub fn from_value(value: Option<serde_json::Value>) -> Result<Self> {
        match value {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Self::empty()),
        }
    }

    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Violation> {
        self.active_issues
            .iter()
            .chain(self.history.iter())
            .find(|v| v.id == id)
    }

    pub fn find_active_by_payload(&self, payload: &str, now: OffsetDateTime) -> Option<&Violation> {
        self.active_issues
            .iter()
            .find(|v| v.payload == payload && v.is_active_at(now))
    }

    /// Append to both sequences.
    pub fn record(&mut self, violation: Violation) {
        self.active_issues.push(violation.clone());
        self.history.push(violation);
    }

    /// Set `dismissed_until` on every entry with `id`, in both sequences.
    /// Returns the number of entries replaced.
    pub fn dismiss(&mut self, id: &str, until: OffsetDateTime) -> usize {
        let mut replaced = 0;
        for entry in self.active_issues.iter_mut().chain(self.history.iter_mut()) {
            if entry.id == id {
                *entry = entry.clone().with_dismissed_until(until);
                replaced += 1;
            }
        }
        replaced
    }

    pub fn active_at(&self, now: OffsetDateTime) -> Vec<Violation> {
        self.active_issues
            .iter()
            .filter(|v| v.is_active_at(now))
            .cloned()
            .collect()
    }

    pub fn dismissed_at(&self, now: OffsetDateTime) -> Vec<Violation> {
        self.history
            .iter()
            .filter(|v| v.is_dismissed_at(now))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ViolationKind, now_millis};
    use time::Duration;

    #[test]
    fn test_record_appends_to_both() {
        let mut state = IssueState::empty();
        state.record(Violation::new(ViolationKind::EMAIL_ADDRESS, "a@b.io"));

        assert_eq!(state.active_issues.len(), 1);
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.active_issues[0].id, state.history[0].id);
    }

    #[test]
    fn test_dismiss_replaces_in_place() {
        let mut state = IssueState::empty();
        let first = Violation::new(ViolationKind::EMAIL_ADDRESS, "a@b.io");
        let second = Violation::new(ViolationKind::PHONE_NUMBER, "5551234");
        state.record(first.clone());
        state.record(second.clone());

        let until = now_millis() + Duration::hours(24);
        assert_eq!(state.dismiss(&first.id, until), 2);

        assert_eq!(state.active_issues[0].dismissed_until, Some(until));
        assert_eq!(state.history[0].dismissed_until, Some(until));
        assert_eq!(state.active_issues[1], second);
        assert_eq!(state.history[1], second);
    }

    #[test]
    fn test_filters() {
        let now = now_millis();
        let mut state = IssueState::empty();
        let open = Violation::new(ViolationKind::EMAIL_ADDRESS, "open@b.io");
        let hidden = Violation::new(ViolationKind::EMAIL_ADDRESS, "hidden@b.io");
        state.record(open.clone());
        state.record(hidden.clone());
        state.dismiss(&hidden.id, now + Duration::hours(1));

        let active = state.active_at(now);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, open.id);

        let dismissed = state.dismissed_at(now);
        assert_eq!(dismissed.len(), 1);
        assert_eq!(dismissed[0].id, hidden.id);

        assert!(state.find_active_by_payload("open@b.io", now).is_some());
        assert!(state.find_active_by_payload("hidden@b.io", now).is_none());
        assert!(state.find_by_id(&hidden.id).is_some());
    }

    #[test]
    fn test_missing_record_is_empty() {
        let state = IssueState::from_value(None).unwrap();
        assert_eq!(state, IssueState::empty());

        let state = IssueState::from_value(Some(serde_json::json!({}))).unwrap();
        assert!(state.active_issues.is_empty());
    }
}
