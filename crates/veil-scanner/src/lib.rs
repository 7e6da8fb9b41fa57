//! Pattern-based detection and redaction
//!
//! Strategies are evaluated in registration order; the first category to
//! claim a literal owns it for the whole scan.

pub mod registry;
pub mod scanner;
pub mod strategy;

pub use registry::StrategyRegistry;
pub use scanner::Scanner;
pub use strategy::{PatternStrategy, ViolationStrategy};
