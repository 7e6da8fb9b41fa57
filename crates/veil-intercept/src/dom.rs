//! Interception of submit gestures on pages without a structured request
//!
//! The host reports each gesture synchronously through
//! [`DomCoordinator::on_gesture`] and must honour the returned
//! [`Disposition`] before the gesture's default effect runs. A suppressed
//! gesture is re-dispatched by the coordinator once the input has been
//! rewritten, or left alone if the scan failed.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use veil_adapters::{
    AiServiceAdapter, Dom, ElementKind, ElementSnapshot, ExtractionContext, ExtractionResult,
    RewriteContext,
};

use crate::correlator::Correlator;
use crate::error::InterceptError;
use crate::state::{InterceptState, StateMachine};

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_RETRIGGER_GUARD: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.meta
    }
}

/// A user action that may send the prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Submit {
        target: ElementSnapshot,
    },
    Click {
        target: ElementSnapshot,
        /// Whether the target sits inside a `<button>`
        inside_button: bool,
    },
    KeyDown {
        key: String,
        modifiers: Modifiers,
        target: ElementSnapshot,
    },
}

impl Gesture {
    /// Whether this gesture looks like it sends the current input.
    pub fn is_submission(&self) -> bool {
        match self {
            Gesture::Submit { target } => target.tag == "form",
            Gesture::Click {
                target,
                inside_button,
            } => *inside_button || is_send_button(target),
            Gesture::KeyDown {
                key,
                modifiers,
                target,
            } => key == "Enter" && !modifiers.any() && is_input_field(target),
        }
    }
}

fn is_send_button(target: &ElementSnapshot) -> bool {
    target.tag == "button"
        || mentions(target.aria_label.as_deref(), &["send", "submit"])
        || mentions(Some(target.text.as_str()), &["send"])
        || mentions(target.class_name.as_deref(), &["send", "submit"])
}

fn mentions(value: Option<&str>, words: &[&str]) -> bool {
    value
        .map(str::to_lowercase)
        .is_some_and(|v| words.iter().any(|w| v.contains(w)))
}

fn is_input_field(target: &ElementSnapshot) -> bool {
    match target.kind {
        ElementKind::TextArea | ElementKind::Input => true,
        ElementKind::ContentEditable => target.tag != "body",
        ElementKind::Other => false,
    }
}

/// What the host must do with a reported gesture.
#[derive(Debug)]
pub enum Disposition {
    /// Let the default effect run.
    Proceed,
    /// Default effect prevented; the coordinator re-dispatches the gesture
    /// when the returned task completes.
    Suppressed(JoinHandle<()>),
    /// Default effect prevented for good; another submission is in flight.
    Dropped,
}

/// The page the coordinator is attached to.
pub trait HostPage: Send + Sync {
    fn document(&self) -> &dyn Dom;

    /// Replay a previously suppressed gesture.
    fn redispatch(&self, gesture: &Gesture);
}

#[derive(Debug, Clone, Copy)]
pub struct DomTiming {
    /// Wait between the rewrite and the re-dispatch
    pub settle_delay: Duration,
    /// How long the coordinator ignores gestures after re-dispatching
    pub retrigger_guard: Duration,
}

impl Default for DomTiming {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            retrigger_guard: DEFAULT_RETRIGGER_GUARD,
        }
    }
}

/// Single-flight coordinator for DOM adapters.
#[derive(Clone)]
pub struct DomCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    host: Arc<dyn HostPage>,
    adapter: Arc<dyn AiServiceAdapter>,
    correlator: Arc<Correlator>,
    selector_hint: Option<String>,
    timing: DomTiming,
    state: StateMachine,
}

impl DomCoordinator {
    pub fn new(
        host: Arc<dyn HostPage>,
        adapter: Arc<dyn AiServiceAdapter>,
        correlator: Arc<Correlator>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                host,
                adapter,
                correlator,
                selector_hint: None,
                timing: DomTiming::default(),
                state: StateMachine::new(),
            }),
        }
    }

    /// Probe `selector` before the adapter's own candidates.
    pub fn with_selector_hint(self, selector: impl Into<String>) -> Self {
        self.rebuild(|inner| inner.selector_hint = Some(selector.into()))
    }

    pub fn with_timing(self, timing: DomTiming) -> Self {
        self.rebuild(|inner| inner.timing = timing)
    }

    fn rebuild(self, apply: impl FnOnce(&mut Inner)) -> Self {
        let mut inner = match Arc::try_unwrap(self.inner) {
            Ok(inner) => inner,
            Err(shared) => Inner {
                host: shared.host.clone(),
                adapter: shared.adapter.clone(),
                correlator: shared.correlator.clone(),
                selector_hint: shared.selector_hint.clone(),
                timing: shared.timing,
                state: StateMachine::new(),
            },
        };
        apply(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn state(&self) -> InterceptState {
        self.inner.state.current()
    }

    /// Decide synchronously what happens to `gesture`. Must be called
    /// inside a tokio runtime.
    pub fn on_gesture(&self, gesture: Gesture) -> Disposition {
        let inner = &self.inner;
        if inner.state.current() == InterceptState::Retriggering {
            return Disposition::Proceed;
        }
        if !gesture.is_submission() {
            return Disposition::Proceed;
        }

        match inner.state.transition(InterceptState::Extracting) {
            Ok(_) => {}
            Err(InterceptError::IllegalTransition {
                from: InterceptState::Retriggering,
                ..
            }) => return Disposition::Proceed,
            Err(_) => {
                debug!("submission already in flight, dropping gesture");
                return Disposition::Dropped;
            }
        }

        let extraction = match inner.extract() {
            Some(extraction) => extraction,
            None => {
                inner.advance(InterceptState::Idle);
                return Disposition::Proceed;
            }
        };
        inner.advance(InterceptState::AwaitingScan);

        let inner = self.inner.clone();
        Disposition::Suppressed(tokio::spawn(async move {
            inner.round_trip(extraction, gesture).await;
        }))
    }
}

impl Inner {
    /// A non-blank message from the page, if any. Adapter errors count as
    /// no message.
    fn extract(&self) -> Option<ExtractionResult> {
        let context = ExtractionContext::Document {
            dom: self.host.document(),
            selector: self.selector_hint.as_deref(),
        };
        match self.adapter.extract_user_message(&context) {
            Ok(Some(extraction)) if extraction.message().is_some() => Some(extraction),
            Ok(_) => None,
            Err(e) => {
                warn!(service = %self.adapter.service_type(), "extraction failed: {}", e);
                None
            }
        }
    }

    async fn round_trip(&self, extraction: ExtractionResult, gesture: Gesture) {
        let mut guard = RoundTripGuard {
            state: &self.state,
            finished: false,
        };
        let message = extraction.message().unwrap_or_default();
        let response = self.correlator.request_scan(message).await;

        match response
            .as_ref()
            .and_then(|r| r.replacement())
            .filter(|r| *r != message)
        {
            Some(replacement) => {
                self.advance(InterceptState::Rewriting);
                let context = RewriteContext {
                    extraction: &extraction,
                    dom: Some(self.host.document()),
                };
                match self.adapter.update_payload(&context, replacement) {
                    Ok(_) => info!(service = %self.adapter.service_type(), "input anonymized"),
                    Err(e) => warn!("failed to rewrite input: {}", e),
                }
            }
            None => debug!("no anonymization applied, keeping original text"),
        }

        tokio::time::sleep(self.timing.settle_delay).await;

        self.advance(InterceptState::Retriggering);
        self.host.redispatch(&gesture);
        tokio::time::sleep(self.timing.retrigger_guard).await;
        self.advance(InterceptState::Idle);
        guard.finished = true;
    }

    fn advance(&self, next: InterceptState) {
        if let Err(e) = self.state.transition(next) {
            error!("{}", e);
            self.state.reset();
        }
    }
}

/// Returns the coordinator to `Idle` if a round trip panics or is aborted
/// before it gets there itself.
struct RoundTripGuard<'a> {
    state: &'a StateMachine,
    finished: bool,
}

impl Drop for RoundTripGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!(state = %self.state.current(), "round trip ended early, returning to idle");
            self.state.reset();
        }
    }
}
