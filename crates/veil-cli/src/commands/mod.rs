pub mod adapter;
pub mod host;
pub mod issues;
pub mod preview;
pub mod scan;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;
use veil_config::Config;
use veil_core::ViolationKind;
use veil_engine::{IssueService, ScanPipeline};
use veil_intercept::DomTiming;
use veil_scanner::{PatternStrategy, Scanner, StrategyRegistry};
use veil_storage::{Storage, StoreIssueRepository};

/// Strategies for the configured categories, in configured order.
pub fn build_registry(config: &Config) -> Result<StrategyRegistry> {
    let mut registry = StrategyRegistry::new();
    for tag in &config.detection.categories {
        let kind = ViolationKind::parse(tag)?;
        let strategy = PatternStrategy::for_kind(&kind)
            .with_context(|| format!("No built-in strategy for category {}", kind))?;
        registry.register(kind, Arc::new(strategy));
    }
    debug!(categories = registry.len(), "strategy registry ready");
    Ok(registry)
}

/// Wire storage, issue rules and the scanner from config.
pub async fn build_pipeline(config: &Config) -> Result<ScanPipeline> {
    // Initialize storage once (creates connection pool and runs migrations)
    let storage = Storage::new(config.storage.path.clone()).await?;
    let repository = StoreIssueRepository::new(Arc::new(storage));

    let window = time::Duration::hours(i64::from(config.issues.dismiss_hours));
    let issues = IssueService::new(Arc::new(repository)).with_dismiss_window(window);

    let scanner = Scanner::new(Arc::new(build_registry(config)?));
    Ok(ScanPipeline::new(Arc::new(scanner), Arc::new(issues))
        .with_context_chars(config.issues.context_chars))
}

pub fn dom_timing(config: &Config) -> DomTiming {
    DomTiming {
        settle_delay: config.intercept.settle_delay(),
        retrigger_guard: config.intercept.retrigger_guard(),
    }
}
