use std::collections::HashMap;
use std::sync::Arc;

use veil_core::ViolationKind;

use crate::strategy::{PatternStrategy, ViolationStrategy};

/// Ordered collection of strategies keyed by category.
///
/// Registering a category twice replaces the strategy but keeps the
/// category's original position.
#[derive(Default, Clone)]
pub struct StrategyRegistry {
    entries: Vec<(ViolationKind, Arc<dyn ViolationStrategy>)>,
    index: HashMap<ViolationKind, usize>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Email, phone number and IP address, in that order.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ViolationKind::EMAIL_ADDRESS, Arc::new(PatternStrategy::email()));
        registry.register(
            ViolationKind::PHONE_NUMBER,
            Arc::new(PatternStrategy::phone_number()),
        );
        registry.register(
            ViolationKind::IP_ADDRESS,
            Arc::new(PatternStrategy::ip_address()),
        );
        registry
    }

    pub fn register(&mut self, kind: ViolationKind, strategy: Arc<dyn ViolationStrategy>) {
        match self.index.get(&kind) {
            Some(&position) => self.entries[position].1 = strategy,
            None => {
                self.index.insert(kind.clone(), self.entries.len());
                self.entries.push((kind, strategy));
            }
        }
    }

    pub fn get(&self, kind: &ViolationKind) -> Option<&Arc<dyn ViolationStrategy>> {
        self.index.get(kind).map(|&position| &self.entries[position].1)
    }

    /// Strategies with the category they were registered under, in registration order.
    pub fn all(&self) -> impl Iterator<Item = (&ViolationKind, &Arc<dyn ViolationStrategy>)> {
        self.entries.iter().map(|(kind, strategy)| (kind, strategy))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
