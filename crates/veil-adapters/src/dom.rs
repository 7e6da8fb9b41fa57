//! Minimal document model used by DOM-based adapters
//!
//! [`Dom`] is the seam to the host page. [`MemoryDom`] implements it over a
//! flat list of elements with a small selector matcher: a tag, `#id`,
//! `.class` and `[attr]`, `[attr="v"]`, `[attr*="v"]` tests, compounded
//! without combinators.

use std::sync::Mutex;

use crate::error::DomError;

/// How an element holds its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    TextArea,
    Input,
    ContentEditable,
    Other,
}

impl ElementKind {
    /// Form controls keep their text in `value`, everything else in text content.
    pub fn is_form_control(self) -> bool {
        matches!(self, ElementKind::TextArea | ElementKind::Input)
    }

    pub fn is_editable(self) -> bool {
        !matches!(self, ElementKind::Other)
    }
}

/// Point-in-time view of one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSnapshot {
    /// Lowercase tag name
    pub tag: String,
    pub kind: ElementKind,
    pub id: Option<String>,
    pub aria_label: Option<String>,
    pub placeholder: Option<String>,
    pub class_name: Option<String>,
    /// Current value for form controls, text content otherwise
    pub text: String,
}

impl ElementSnapshot {
    pub fn new(tag: &str, kind: ElementKind) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            kind,
            id: None,
            aria_label: None,
            placeholder: None,
            class_name: None,
            text: String::new(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_aria_label(mut self, label: &str) -> Self {
        self.aria_label = Some(label.to_string());
        self
    }

    pub fn with_placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = Some(placeholder.to_string());
        self
    }

    pub fn with_class(mut self, class_name: &str) -> Self {
        self.class_name = Some(class_name.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        match name {
            "id" => self.id.as_deref(),
            "aria-label" => self.aria_label.as_deref(),
            "placeholder" => self.placeholder.as_deref(),
            "class" => self.class_name.as_deref(),
            "contenteditable" => (self.kind == ElementKind::ContentEditable).then_some("true"),
            _ => None,
        }
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.class_name
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
    }

    /// Best-effort unique selector: id, aria-label, placeholder, first
    /// class, then tag name.
    pub fn locator(&self) -> String {
        if let Some(id) = self.id.as_deref().filter(|id| !id.is_empty()) {
            return format!("#{}", id);
        }
        if let Some(label) = self.aria_label.as_deref().filter(|l| !l.is_empty()) {
            return format!("[aria-label=\"{}\"]", label);
        }
        if self.kind == ElementKind::TextArea {
            if let Some(placeholder) = self.placeholder.as_deref().filter(|p| !p.is_empty()) {
                return format!("textarea[placeholder=\"{}\"]", placeholder);
            }
        }
        if let Some(class) = self.classes().next() {
            return format!(".{}", class);
        }
        self.tag.clone()
    }
}

/// Access to the host page's document.
pub trait Dom: Send + Sync {
    /// First element matching `selector`.
    fn query_selector(&self, selector: &str) -> Result<Option<ElementSnapshot>, DomError>;

    fn set_value(&self, selector: &str, value: &str) -> Result<(), DomError>;

    fn set_text_content(&self, selector: &str, text: &str) -> Result<(), DomError>;

    /// Fire a bubbling `input` event so the page's own state sees the edit.
    fn dispatch_input(&self, selector: &str) -> Result<(), DomError>;
}

/// Mutation recorded by [`MemoryDom`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomEvent {
    ValueSet { selector: String, value: String },
    TextSet { selector: String, text: String },
    Input { selector: String },
}

/// In-process document.
#[derive(Default)]
pub struct MemoryDom {
    elements: Mutex<Vec<ElementSnapshot>>,
    events: Mutex<Vec<DomEvent>>,
}

impl MemoryDom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(self, element: ElementSnapshot) -> Self {
        self.insert(element);
        self
    }

    pub fn insert(&self, element: ElementSnapshot) {
        lock(&self.elements).push(element);
    }

    pub fn events(&self) -> Vec<DomEvent> {
        lock(&self.events).clone()
    }

    /// Current text of the first element matching `selector`.
    pub fn text_of(&self, selector: &str) -> Option<String> {
        self.query_selector(selector).ok().flatten().map(|e| e.text)
    }

    fn update(&self, selector: &str, text: &str) -> Result<(), DomError> {
        let compiled = Selector::parse(selector)?;
        let mut elements = lock(&self.elements);
        let element = elements
            .iter_mut()
            .find(|e| compiled.matches(e))
            .ok_or_else(|| DomError::NotFound(selector.to_string()))?;
        element.text = text.to_string();
        Ok(())
    }

    fn record(&self, event: DomEvent) {
        lock(&self.events).push(event);
    }
}

impl Dom for MemoryDom {
    fn query_selector(&self, selector: &str) -> Result<Option<ElementSnapshot>, DomError> {
        let compiled = Selector::parse(selector)?;
        Ok(lock(&self.elements)
            .iter()
            .find(|e| compiled.matches(e))
            .cloned())
    }

    fn set_value(&self, selector: &str, value: &str) -> Result<(), DomError> {
        self.update(selector, value)?;
        self.record(DomEvent::ValueSet {
            selector: selector.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn set_text_content(&self, selector: &str, text: &str) -> Result<(), DomError> {
        self.update(selector, text)?;
        self.record(DomEvent::TextSet {
            selector: selector.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    fn dispatch_input(&self, selector: &str) -> Result<(), DomError> {
        if self.query_selector(selector)?.is_none() {
            return Err(DomError::NotFound(selector.to_string()));
        }
        self.record(DomEvent::Input {
            selector: selector.to_string(),
        });
        Ok(())
    }
}

// Poisoning only happens if a test panicked mid-update
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, PartialEq)]
enum AttrOp {
    Exists,
    Equals(String),
    Contains(String),
}

#[derive(Debug, Default)]
struct Selector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, AttrOp)>,
}

impl Selector {
    fn parse(input: &str) -> Result<Self, DomError> {
        let invalid = || DomError::InvalidSelector(input.to_string());
        let source = input.trim();
        if source.is_empty() {
            return Err(invalid());
        }

        let mut selector = Selector::default();
        let mut rest = source;

        if rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
            let (ident, tail) = split_ident(rest);
            selector.tag = Some(ident.to_ascii_lowercase());
            rest = tail;
        }

        while let Some(c) = rest.chars().next() {
            match c {
                '#' | '.' => {
                    let (ident, tail) = split_ident(&rest[1..]);
                    if ident.is_empty() {
                        return Err(invalid());
                    }
                    if c == '#' {
                        selector.id = Some(ident.to_string());
                    } else {
                        selector.classes.push(ident.to_string());
                    }
                    rest = tail;
                }
                '[' => {
                    let close = find_attr_end(rest).ok_or_else(invalid)?;
                    let body = &rest[1..close];
                    selector.attrs.push(parse_attr(body).ok_or_else(invalid)?);
                    rest = &rest[close + 1..];
                }
                _ => return Err(invalid()),
            }
        }

        Ok(selector)
    }

    fn matches(&self, element: &ElementSnapshot) -> bool {
        if self.tag.as_deref().is_some_and(|tag| tag != element.tag) {
            return false;
        }
        if self.id.is_some() && self.id.as_deref() != element.id.as_deref() {
            return false;
        }
        if !self
            .classes
            .iter()
            .all(|class| element.classes().any(|c| c == class))
        {
            return false;
        }
        self.attrs.iter().all(|(name, op)| {
            let value = element.attribute(name);
            match op {
                AttrOp::Exists => value.is_some(),
                AttrOp::Equals(expected) => value == Some(expected.as_str()),
                AttrOp::Contains(needle) => value.is_some_and(|v| v.contains(needle.as_str())),
            }
        })
    }
}

fn split_ident(input: &str) -> (&str, &str) {
    let end = input
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(input.len());
    input.split_at(end)
}

/// Index of the `]` closing the attribute test at the start of `input`,
/// ignoring brackets inside quotes.
fn find_attr_end(input: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in input.char_indices().skip(1) {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, ']') => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_attr(body: &str) -> Option<(String, AttrOp)> {
    let (name, op) = match body.find('=') {
        None => (body, AttrOp::Exists),
        Some(eq) => {
            let (name, contains) = match body[..eq].strip_suffix('*') {
                Some(name) => (name, true),
                None => (&body[..eq], false),
            };
            let value = unquote(body[eq + 1..].trim())?.to_string();
            let op = if contains {
                AttrOp::Contains(value)
            } else {
                AttrOp::Equals(value)
            };
            (name, op)
        }
    };

    let name = name.trim();
    if name.is_empty() || !split_ident(name).1.is_empty() {
        return None;
    }
    Some((name.to_ascii_lowercase(), op))
}

fn unquote(value: &str) -> Option<&str> {
    for q in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(q) {
            return inner.strip_suffix(q);
        }
    }
    (!value.is_empty()).then_some(value)
}
