use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;
use veil_core::{ScanResult, Violation, now_millis};

use crate::StrategyRegistry;

/// Runs every registered strategy over a text and redacts what it finds.
pub struct Scanner {
    registry: Arc<StrategyRegistry>,
}

impl Scanner {
    pub fn new(registry: Arc<StrategyRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Scan `text`, skipping literals whose payload is in `dismissed`.
    ///
    /// Each surviving literal yields one violation and every occurrence of it
    /// is replaced by the category marker. Matches are taken from the input
    /// text, so a literal already consumed by an earlier category's
    /// replacement still yields its violation.
    pub fn scan_and_anonymize(&self, text: &str, dismissed: &[Violation]) -> ScanResult {
        let dismissed: HashSet<&str> = dismissed.iter().map(|v| v.payload.as_str()).collect();
        let detected_at = now_millis();

        let mut claimed: HashSet<&str> = HashSet::new();
        let mut found = Vec::new();
        let mut anonymized = text.to_string();

        for (kind, strategy) in self.registry.all() {
            if !strategy.rule(text) {
                continue;
            }

            for m in strategy.pattern().find_iter(text) {
                let literal = m.as_str();
                if literal.is_empty() || dismissed.contains(literal) || !claimed.insert(literal) {
                    continue;
                }

                anonymized = anonymized.replace(literal, &kind.marker());
                found.push(Violation::detected_at(kind.clone(), literal, detected_at));
            }
        }

        debug!(violations = found.len(), "scan complete");

        ScanResult {
            has_issues: !found.is_empty(),
            anonymized_text: anonymized,
            found_violations: found,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PatternStrategy;
    use veil_core::ViolationKind;

    fn scanner() -> Scanner {
        Scanner::new(Arc::new(StrategyRegistry::with_defaults()))
    }

    #[test]
    fn test_single_email() {
        let result = scanner().scan_and_anonymize("Contact me at test@example.com", &[]);

        assert!(result.has_issues);
        assert_eq!(result.anonymized_text, "Contact me at [EMAIL_ADDRESS]");
        assert_eq!(result.found_violations.len(), 1);
        assert_eq!(result.found_violations[0].payload, "test@example.com");
        assert_eq!(result.found_violations[0].kind, ViolationKind::EMAIL_ADDRESS);
    }

    #[test]
    fn test_email_and_phone() {
        let result = scanner().scan_and_anonymize("Contact test1@example.com or +1234567890", &[]);

        assert_eq!(result.found_violations.len(), 2);
        assert_eq!(
            result.anonymized_text,
            "Contact [EMAIL_ADDRESS] or [PHONE_NUMBER]"
        );
        assert_eq!(result.found_violations[1].payload, "+1234567890");
    }

    #[test]
    fn test_repeated_literal_collapses() {
        let text = "a@b.io, again a@b.io and once more a@b.io";
        let result = scanner().scan_and_anonymize(text, &[]);

        assert_eq!(result.found_violations.len(), 1);
        assert_eq!(
            result.anonymized_text,
            "[EMAIL_ADDRESS], again [EMAIL_ADDRESS] and once more [EMAIL_ADDRESS]"
        );
    }

    #[test]
    fn test_dismissed_payload_is_skipped() {
        let dismissed = vec![Violation::new(ViolationKind::EMAIL_ADDRESS, "safe@example.com")];
        let result = scanner().scan_and_anonymize("safe@example.com and bad@example.com", &dismissed);

        assert_eq!(result.found_violations.len(), 1);
        assert_eq!(result.found_violations[0].payload, "bad@example.com");
        assert_eq!(result.anonymized_text, "safe@example.com and [EMAIL_ADDRESS]");
    }

    #[test]
    fn test_redacted_output_is_clean() {
        let s = scanner();
        let first = s.scan_and_anonymize("mail a@b.io, call +4915112345678, ping 10.1.2.3", &[]);
        assert!(first.has_issues);

        let second = s.scan_and_anonymize(&first.anonymized_text, &[]);
        assert!(!second.has_issues);
        assert_eq!(second.anonymized_text, first.anonymized_text);
    }

    #[test]
    fn test_registration_order_breaks_ties() {
        let digits = PatternStrategy::new(ViolationKind::parse("ACCOUNT").unwrap(), "Account", r"[0-9]{6}").unwrap();

        let mut registry = StrategyRegistry::new();
        registry.register(ViolationKind::parse("ACCOUNT").unwrap(), Arc::new(digits));
        registry.register(ViolationKind::PHONE_NUMBER, Arc::new(PatternStrategy::phone_number()));
        let result = Scanner::new(Arc::new(registry)).scan_and_anonymize("id 123456", &[]);

        assert_eq!(result.found_violations.len(), 1);
        assert_eq!(result.found_violations[0].kind.as_str(), "ACCOUNT");
        assert_eq!(result.anonymized_text, "id [ACCOUNT]");
    }

    #[test]
    fn test_regex_metacharacters_replaced_literally() {
        let result = scanner().scan_and_anonymize("x+y.z@a-b.io or xy.z@a-b.io", &[]);
        assert_eq!(result.anonymized_text, "[EMAIL_ADDRESS] or [EMAIL_ADDRESS]");
        assert_eq!(result.found_violations.len(), 2);
    }

    #[test]
    fn test_no_matches() {
        let result = scanner().scan_and_anonymize("Just some normal prose here", &[]);
        assert!(!result.has_issues);
        assert_eq!(result.anonymized_text, "Just some normal prose here");
        assert!(result.found_violations.is_empty());
    }
}
