use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use veil_adapters::{AiServiceRegistry, Dom, ElementKind, ElementSnapshot, MemoryDom};
use veil_engine::{IssueFeed, IssueService, ScanPipeline};
use veil_intercept::{
    BroadcastChannel, Correlator, DEFAULT_SCAN_TIMEOUT, Disposition, DomCoordinator, Fetch,
    Gesture, HostPage, InterceptedFetch, Modifiers, OutboundRequest, Route, ScanBridge,
};
use veil_scanner::{Scanner, StrategyRegistry};
use veil_storage::{Storage, StoreIssueRepository};

const CONVERSATION_URL: &str = "https://chatgpt.com/backend-api/conversation";

#[derive(Default)]
struct RecordingFetch {
    bodies: Mutex<Vec<String>>,
}

#[async_trait]
impl Fetch for RecordingFetch {
    type Response = ();

    async fn fetch(&self, request: OutboundRequest) {
        self.bodies.lock().unwrap().push(request.body.unwrap_or_default());
    }
}

struct Page {
    dom: MemoryDom,
    replayed: Mutex<usize>,
}

impl HostPage for Page {
    fn document(&self) -> &dyn Dom {
        &self.dom
    }

    fn redispatch(&self, _gesture: &Gesture) {
        *self.replayed.lock().unwrap() += 1;
    }
}

async fn create_pipeline() -> (Arc<ScanPipeline>, std::path::PathBuf) {
    let test_dir = std::env::temp_dir().join(format!("veil-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&test_dir).unwrap();
    let storage = Storage::new(Some(test_dir.join("test.db"))).await.unwrap();

    let repository = StoreIssueRepository::new(Arc::new(storage));
    let issues = Arc::new(IssueService::new(Arc::new(repository)));
    let scanner = Arc::new(Scanner::new(Arc::new(StrategyRegistry::with_defaults())));
    (Arc::new(ScanPipeline::new(scanner, issues)), test_dir)
}

fn conversation(text: &str) -> String {
    json!({
        "action": "next",
        "messages": [{"author": {"role": "user"}, "content": {"content_type": "text", "parts": [text]}}]
    })
    .to_string()
}

fn first_part(body: &str) -> String {
    let body: Value = serde_json::from_str(body).unwrap();
    body["messages"][0]["content"]["parts"][0].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_network_interception_lifecycle() {
    let (pipeline, test_dir) = create_pipeline().await;
    let issues = pipeline.issues().clone();
    let mut feed = IssueFeed::spawn(issues.clone()).await;

    let channel = Arc::new(BroadcastChannel::default());
    let bridge = Arc::new(ScanBridge::new(pipeline.clone(), channel.clone()));
    let mut detections = bridge.detections();
    let _bridge_task = bridge.clone().spawn();

    let registry = AiServiceRegistry::with_defaults();
    let Some(Route::Network(adapter)) = Route::for_page(&registry, CONVERSATION_URL) else {
        panic!("chatgpt should use the network path");
    };
    let correlator = Arc::new(Correlator::new(channel, DEFAULT_SCAN_TIMEOUT));
    let fetch = InterceptedFetch::new(RecordingFetch::default(), adapter, correlator);

    let text = "Contact test1@example.com or +1234567890";
    fetch.fetch(OutboundRequest::post(CONVERSATION_URL, conversation(text))).await;

    let sent = fetch.inner().bodies.lock().unwrap()[0].clone();
    assert_eq!(first_part(&sent), "Contact [EMAIL_ADDRESS] or [PHONE_NUMBER]");
    assert_eq!(detections.recv().await.unwrap().violations.len(), 2);

    let state = feed.changed().await.unwrap();
    assert!(!state.active_issues.is_empty());

    // dismissing the email lets it through on the next send
    let active = issues.get_active_issues().await.unwrap();
    let email = active.iter().find(|v| v.payload == "test1@example.com").unwrap();
    issues.dismiss_issue(&email.id).await.unwrap();

    fetch.fetch(OutboundRequest::post(CONVERSATION_URL, conversation(text))).await;
    let sent = fetch.inner().bodies.lock().unwrap()[1].clone();
    assert_eq!(first_part(&sent), "Contact test1@example.com or [PHONE_NUMBER]");

    std::fs::remove_dir_all(&test_dir).unwrap();
}

#[tokio::test]
async fn test_dom_interception_round_trip() {
    let (pipeline, test_dir) = create_pipeline().await;

    let channel = Arc::new(BroadcastChannel::default());
    let _bridge_task = Arc::new(ScanBridge::new(pipeline.clone(), channel.clone())).spawn();

    let registry = AiServiceRegistry::with_defaults();
    let Some(Route::Dom(adapter)) = Route::for_page(&registry, "https://gemini.google.com/app") else {
        panic!("gemini should use the DOM path");
    };

    let editor = ElementSnapshot::new("div", ElementKind::ContentEditable)
        .with_class("ql-editor textarea")
        .with_aria_label("Enter a prompt here");
    let page = Arc::new(Page {
        dom: MemoryDom::new().with_element(editor.clone().with_text("server at 192.168.1.20")),
        replayed: Mutex::new(0),
    });
    let correlator = Arc::new(Correlator::new(channel, DEFAULT_SCAN_TIMEOUT));
    let coordinator = DomCoordinator::new(page.clone(), adapter, correlator);

    let gesture = Gesture::KeyDown {
        key: "Enter".to_string(),
        modifiers: Modifiers::none(),
        target: editor,
    };
    let Disposition::Suppressed(task) = coordinator.on_gesture(gesture) else {
        panic!("gesture should be suppressed");
    };
    task.await.unwrap();

    let text = page.dom.text_of(".ql-editor").unwrap();
    assert!(!text.contains("192.168.1.20"));
    assert_eq!(*page.replayed.lock().unwrap(), 1);

    let recorded = pipeline.issues().get_active_issues().await.unwrap();
    assert!(!recorded.is_empty());
    assert_eq!(recorded[0].context.as_deref(), Some("server at 192.168.1.20"));

    std::fs::remove_dir_all(&test_dir).unwrap();
}
