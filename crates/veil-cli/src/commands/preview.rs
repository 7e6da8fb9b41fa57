//! Dry run of the page-side interception against the local scanner

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;
use veil_adapters::{AiServiceAdapter, AiServiceRegistry, Dom, ElementKind, ElementSnapshot, MemoryDom};
use veil_config::Config;
use veil_intercept::{
    BroadcastChannel, Correlator, Disposition, DomCoordinator, DomTiming, Fetch, Gesture, HostPage,
    InterceptedFetch, Modifiers, OutboundRequest, Route, ScanBridge,
};

use super::{build_pipeline, dom_timing};

const PROMPT_SELECTOR: &str = "#prompt";

pub async fn handle(config: &Config, url: &str, input: &str) -> Result<()> {
    match preview(config, url, input).await? {
        Some(sent) => println!("{}", sent),
        None => println!("No adapter handles {}", url),
    }
    Ok(())
}

/// What would leave the page for `url`: the request body for network
/// adapters, the prompt text for DOM adapters.
pub async fn preview(config: &Config, url: &str, input: &str) -> Result<Option<String>> {
    let registry = AiServiceRegistry::with_defaults();
    let Some(route) = Route::for_page(&registry, url) else {
        return Ok(None);
    };

    let channel = Arc::new(BroadcastChannel::default());
    let pipeline = build_pipeline(config).await?;
    let relay = Arc::new(ScanBridge::new(Arc::new(pipeline), channel.clone())).spawn();
    let correlator = Arc::new(Correlator::new(channel, config.intercept.scan_timeout()));

    let sent = match route {
        Route::Network(adapter) => {
            let fetch = InterceptedFetch::new(DryRun, adapter, correlator);
            fetch
                .fetch(OutboundRequest::post(url, input))
                .await
                .body
                .unwrap_or_default()
        }
        Route::Dom(adapter) => submit_prompt(adapter, correlator, dom_timing(config), input).await?,
    };

    relay.abort();
    Ok(Some(sent))
}

/// Returns the request instead of sending it.
struct DryRun;

#[async_trait]
impl Fetch for DryRun {
    type Response = OutboundRequest;

    async fn fetch(&self, request: OutboundRequest) -> OutboundRequest {
        request
    }
}

struct PreviewPage {
    dom: MemoryDom,
}

impl HostPage for PreviewPage {
    fn document(&self) -> &dyn Dom {
        &self.dom
    }

    fn redispatch(&self, gesture: &Gesture) {
        debug!(?gesture, "submission replayed");
    }
}

/// Press Enter in a prompt box holding `text` and wait for the round trip.
async fn submit_prompt(
    adapter: Arc<dyn AiServiceAdapter>,
    correlator: Arc<Correlator>,
    timing: DomTiming,
    text: &str,
) -> Result<String> {
    let prompt = ElementSnapshot::new("textarea", ElementKind::TextArea)
        .with_id("prompt")
        .with_text(text);
    let page = Arc::new(PreviewPage {
        dom: MemoryDom::new().with_element(prompt.clone()),
    });

    let coordinator = DomCoordinator::new(page.clone(), adapter, correlator)
        .with_selector_hint(PROMPT_SELECTOR)
        .with_timing(timing);
    let gesture = Gesture::KeyDown {
        key: "Enter".to_string(),
        modifiers: Modifiers::none(),
        target: prompt,
    };
    if let Disposition::Suppressed(round_trip) = coordinator.on_gesture(gesture) {
        round_trip.await?;
    }

    Ok(page.dom.text_of(PROMPT_SELECTOR).unwrap_or_default())
}
