//! AI service adapters
//!
//! Each adapter knows how one chat service carries the user's prompt, either
//! inside an outbound request body or in an input element of the page.

pub mod adapter;
pub mod chatgpt;
pub mod dom;
pub mod error;
pub mod gemini;
pub mod registry;

pub use adapter::{
    AiServiceAdapter, ExtractionContext, ExtractionResult, ExtractionSource, MessagePath,
    PathSegment, PayloadSnapshot, RewriteContext, ServiceType,
};
pub use chatgpt::ChatGptAdapter;
pub use dom::{Dom, DomEvent, ElementKind, ElementSnapshot, MemoryDom};
pub use error::{AdapterError, DomError, Result};
pub use gemini::GeminiAdapter;
pub use registry::AiServiceRegistry;
