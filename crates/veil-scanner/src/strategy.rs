use regex::Regex;
use veil_core::ViolationKind;

/// A detection rule for one violation category.
pub trait ViolationStrategy: Send + Sync {
    fn kind(&self) -> &ViolationKind;

    fn description(&self) -> &str;

    /// Pattern used to collect matches.
    fn pattern(&self) -> &Regex;

    /// Cheap test run before collecting matches.
    fn rule(&self, text: &str) -> bool {
        self.pattern().is_match(text)
    }
}

/// Strategy backed by a single regular expression.
pub struct PatternStrategy {
    kind: ViolationKind,
    description: String,
    regex: Regex,
}

impl PatternStrategy {
    pub fn new(
        kind: ViolationKind,
        description: impl Into<String>,
        pattern: &str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            kind,
            description: description.into(),
            regex: Regex::new(pattern)?,
        })
    }

    pub fn email() -> Self {
        Self::builtin(
            ViolationKind::EMAIL_ADDRESS,
            "Email",
            r"(?i)[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]+",
        )
    }

    /// Deliberately permissive: any run of 2-15 digits, optionally `+` prefixed.
    pub fn phone_number() -> Self {
        Self::builtin(
            ViolationKind::PHONE_NUMBER,
            "Phone number",
            r"\+?[1-9][0-9]{1,14}",
        )
    }

    pub fn ip_address() -> Self {
        Self::builtin(
            ViolationKind::IP_ADDRESS,
            "IP address",
            r"\b(?:(?:25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9]?[0-9])\.){3}(?:25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9]?[0-9])\b",
        )
    }

    pub fn url() -> Self {
        Self::builtin(
            ViolationKind::URL,
            "URL",
            r"(?i)\bhttps?://(?:www\.)?[a-z0-9\-]+(?:\.[a-z0-9\-]+)+(?:/[^\s]*)?\b",
        )
    }

    /// Built-in strategy for a known category.
    pub fn for_kind(kind: &ViolationKind) -> Option<Self> {
        match kind.as_str() {
            "EMAIL_ADDRESS" => Some(Self::email()),
            "PHONE_NUMBER" => Some(Self::phone_number()),
            "IP_ADDRESS" => Some(Self::ip_address()),
            "URL" => Some(Self::url()),
            _ => None,
        }
    }

    fn builtin(kind: ViolationKind, description: &str, pattern: &str) -> Self {
        Self::new(kind, description, pattern).expect("built-in pattern compiles")
    }
}

impl ViolationStrategy for PatternStrategy {
    fn kind(&self) -> &ViolationKind {
        &self.kind
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn pattern(&self) -> &Regex {
        &self.regex
    }
}
