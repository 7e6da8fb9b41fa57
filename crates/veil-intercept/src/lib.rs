//! Interception and correlation across the page/privileged boundary
//!
//! The page side extracts the prompt through an adapter and asks for a scan
//! with [`Correlator::request_scan`]. The privileged side answers through
//! [`ScanBridge`] or the stdio [`host`]. Every failure on the page side
//! lets the user's original action through unchanged.

pub mod bridge;
pub mod channel;
pub mod correlator;
pub mod dom;
pub mod error;
pub mod host;
pub mod network;
pub mod protocol;
pub mod route;
pub mod state;

pub use bridge::{Detection, ScanBackend, ScanBridge};
pub use channel::{BroadcastChannel, MessageChannel};
pub use correlator::{Correlator, DEFAULT_SCAN_TIMEOUT};
pub use dom::{Disposition, DomCoordinator, DomTiming, Gesture, HostPage, Modifiers};
pub use error::{InterceptError, Result};
pub use host::run_stdio;
pub use network::{Fetch, InterceptedFetch, OutboundRequest};
pub use protocol::{Message, ScanRequest, ScanResponse};
pub use route::Route;
pub use state::{InterceptState, StateMachine};
