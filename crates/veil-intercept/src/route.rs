use std::fmt;
use std::sync::Arc;

use tracing::debug;
use veil_adapters::{AiServiceAdapter, AiServiceRegistry, ExtractionSource};

/// Which interception path a page gets, decided once per page load.
#[derive(Clone)]
pub enum Route {
    /// Wrap outbound requests with [`crate::InterceptedFetch`]
    Network(Arc<dyn AiServiceAdapter>),
    /// Watch submit gestures with [`crate::DomCoordinator`]
    Dom(Arc<dyn AiServiceAdapter>),
}

impl Route {
    pub fn for_page(registry: &AiServiceRegistry, page_url: &str) -> Option<Self> {
        let Some(adapter) = registry.get_adapter_for_url(page_url) else {
            debug!(page_url, "no adapter for page");
            return None;
        };
        Some(match adapter.extraction_source() {
            ExtractionSource::Network => Route::Network(adapter),
            ExtractionSource::Dom => Route::Dom(adapter),
        })
    }

    pub fn adapter(&self) -> &Arc<dyn AiServiceAdapter> {
        match self {
            Route::Network(adapter) | Route::Dom(adapter) => adapter,
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (path, adapter) = match self {
            Route::Network(adapter) => ("Network", adapter),
            Route::Dom(adapter) => ("Dom", adapter),
        };
        f.debug_tuple(path).field(adapter.service_type()).finish()
    }
}
