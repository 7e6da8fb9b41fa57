use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};
use url::Url;

use crate::adapter::{AiServiceAdapter, ServiceType};
use crate::chatgpt::ChatGptAdapter;
use crate::gemini::GeminiAdapter;

/// Maps target URLs to the adapter responsible for them.
#[derive(Default, Clone)]
pub struct AiServiceRegistry {
    adapters: Vec<Arc<dyn AiServiceAdapter>>,
    by_domain: HashMap<String, Arc<dyn AiServiceAdapter>>,
}

impl AiServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the ChatGPT and Gemini adapters.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ChatGptAdapter::new()));
        registry.register(Arc::new(GeminiAdapter::new()));
        registry
    }

    /// Index `adapter` by service type and by each of its domains. A later
    /// registration takes over both.
    pub fn register(&mut self, adapter: Arc<dyn AiServiceAdapter>) {
        for domain in adapter.supported_domains() {
            if let Some(previous) = self.by_domain.insert(domain.to_string(), adapter.clone()) {
                debug!(
                    domain,
                    previous = %previous.service_type(),
                    "domain re-registered"
                );
            }
        }

        match self
            .adapters
            .iter_mut()
            .find(|a| a.service_type() == adapter.service_type())
        {
            Some(slot) => *slot = adapter,
            None => self.adapters.push(adapter),
        }
    }

    /// Domain index hit that also accepts the URL, else the first adapter in
    /// registration order that does.
    pub fn get_adapter_for_url(&self, url: &str) -> Option<Arc<dyn AiServiceAdapter>> {
        let hostname = match Url::parse(url) {
            Ok(parsed) => parsed.host_str().map(str::to_string),
            Err(e) => {
                warn!(url, "cannot parse target url: {}", e);
                return None;
            }
        };

        if let Some(adapter) = hostname.and_then(|host| self.by_domain.get(&host)) {
            if adapter.can_handle(url) {
                return Some(adapter.clone());
            }
        }

        self.adapters.iter().find(|a| a.can_handle(url)).cloned()
    }

    pub fn get_adapter_by_type(&self, service_type: &ServiceType) -> Option<Arc<dyn AiServiceAdapter>> {
        self.adapters
            .iter()
            .find(|a| a.service_type() == service_type)
            .cloned()
    }

    pub fn all_adapters(&self) -> &[Arc<dyn AiServiceAdapter>] {
        &self.adapters
    }
}
