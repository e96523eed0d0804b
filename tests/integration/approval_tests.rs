//! Integration tests for the approval workflow
//!
//! A real extraction service runs on a local port with a stubbed model; the
//! bot side talks to it over HTTP and publishes to a wiremock calendar.

use async_trait::async_trait;
use linkcal::approval::{
    AdminAllowlist, ApprovalWorkflow, ChatId, ChatTransport, IgnoreReason, IncomingMessage, InMemoryPendingStore,
    MessageKey, MessageOutcome, PendingApproval, PendingStore, ReactionEvent, ReactionOutcome, TransportError,
    WorkflowSettings,
};
use linkcal::bot::HttpEventService;
use linkcal::calendar::{CalendarPublisher, GoogleCalendarPublisher, StoredToken};
use linkcal::config::{BotConfig, CalendarConfig, Config};
use linkcal::extract::{LanguageModel, ModelRequest};
use linkcal::pipeline::EventPipeline;
use linkcal::server::{create_router, AppState};
use linkcal::{EventDraft, ExtractionError};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LAUNCH_PAGE: &str = "<html><body><h1>Launch Party</h1><p>Join us June 1 2024 6pm at HQ</p></body></html>";

const MODEL_ANSWER: &str = "```json\n{\"title\": \"Launch Party\", \"description\": \"Source: page\\n\\nJoin us\", \
\"start_time\": \"2024-06-01T18:00:00-05:00\", \"end_time\": \"2024-06-01T21:00:00-05:00\", \"location\": \"HQ\"}\n```";

const EVENTS_PATH: &str = "/calendar/v3/calendars/primary/events";

struct StubModel;

#[async_trait]
impl LanguageModel for StubModel {
    async fn complete(&self, _request: &ModelRequest) -> Result<String, ExtractionError> {
        Ok(MODEL_ANSWER.to_string())
    }
}

/// Records everything the bot would have sent to the chat
#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<(ChatId, String)>>,
    reactions: Mutex<Vec<(MessageKey, String)>>,
}

impl RecordingTransport {
    fn texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, text)| text.clone()).collect()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        _reply_to: Option<i64>,
    ) -> Result<MessageKey, TransportError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push((chat_id, text.to_string()));
        Ok(MessageKey::new(chat_id, 500 + sent.len() as i64))
    }

    async fn set_reaction(&self, message: MessageKey, emoji: &str) -> Result<(), TransportError> {
        self.reactions.lock().unwrap().push((message, emoji.to_string()));
        Ok(())
    }
}

struct Harness {
    workflow: Arc<ApprovalWorkflow>,
    transport: Arc<RecordingTransport>,
    store: Arc<InMemoryPendingStore>,
    pages: MockServer,
    google: MockServer,
}

/// Starts the page server, the calendar mock and the HTTP service
async fn harness() -> Harness {
    let pages = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/launch"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LAUNCH_PAGE))
        .mount(&pages)
        .await;

    let google = MockServer::start().await;

    let calendar = CalendarConfig {
        api_base: format!("{}/calendar/v3", google.uri()),
        ..CalendarConfig::default()
    };
    let token = StoredToken::new("token");
    let publisher: Arc<dyn CalendarPublisher> = Arc::new(GoogleCalendarPublisher::new(&calendar, token).unwrap());
    let pipeline = EventPipeline::with_model(&Config::default(), Arc::new(StubModel)).unwrap();
    let app = create_router(AppState::new(pipeline, Some(publisher)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let service = HttpEventService::new(&BotConfig {
        api_url: format!("http://{}", addr),
        ..BotConfig::default()
    })
    .unwrap();

    let transport = Arc::new(RecordingTransport::default());
    let store = Arc::new(InMemoryPendingStore::new());
    let workflow = ApprovalWorkflow::new(
        store.clone(),
        AdminAllowlist::new(["@Organizer"]),
        transport.clone(),
        Arc::new(service),
        WorkflowSettings::default(),
    );

    Harness {
        workflow: Arc::new(workflow),
        transport,
        store,
        pages,
        google,
    }
}

fn launch_draft() -> EventDraft {
    EventDraft {
        title: "Launch Party".to_string(),
        description: "Source: page\n\nJoin us".to_string(),
        start_time: "2024-06-01T18:00:00-05:00".to_string(),
        end_time: "2024-06-01T21:00:00-05:00".to_string(),
        location: "HQ".to_string(),
    }
}

fn seed_pending(store: &InMemoryPendingStore, key: MessageKey) {
    store.insert(
        key,
        PendingApproval {
            draft: launch_draft(),
            chat_id: key.chat_id,
            source_url: "https://example.com/launch".to_string(),
            posted_at: chrono::Utc::now(),
        },
    );
}

fn reaction(key: MessageKey, actor: &str) -> ReactionEvent {
    ReactionEvent {
        message: key,
        actor: Some(actor.to_string()),
        emojis: vec!["👍".to_string()],
    }
}

#[tokio::test]
async fn test_link_to_published_event() {
    let h = harness().await;
    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .and(body_json(json!({
            "summary": "Launch Party",
            "location": "HQ",
            "description": "Source: page\n\nJoin us",
            "start": {"dateTime": "2024-06-01T18:00:00-05:00", "timeZone": "America/Chicago"},
            "end": {"dateTime": "2024-06-01T21:00:00-05:00", "timeZone": "America/Chicago"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "gcal-1"})))
        .expect(1)
        .mount(&h.google)
        .await;

    let outcome = h
        .workflow
        .handle_message(IncomingMessage {
            message: MessageKey::new(-42, 7),
            text: format!("Anyone going? {}/launch", h.pages.uri()),
            sender: Some("guest".to_string()),
        })
        .await;

    let posted = MessageKey::new(-42, 501);
    assert_eq!(outcome, MessageOutcome::Drafted { posted, warnings: 0 });
    assert_eq!(
        h.transport.reactions.lock().unwrap().clone(),
        vec![(MessageKey::new(-42, 7), "👀".to_string())]
    );
    assert!(h.transport.texts()[0].starts_with("Event Detected! 🎉\nTitle: Launch Party\n"));
    assert_eq!(h.store.get(&posted).unwrap().draft, launch_draft());

    let outcome = h.workflow.handle_reaction(reaction(posted, "organizer")).await;

    assert_eq!(
        outcome,
        ReactionOutcome::Published {
            event_id: "gcal-1".to_string()
        }
    );
    assert!(h.store.is_empty());
    assert!(h.transport.texts()[1].contains("Event ID: gcal-1"));
}

#[tokio::test]
async fn test_non_admin_reaction_changes_nothing() {
    let h = harness().await;
    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "never"})))
        .expect(0)
        .mount(&h.google)
        .await;

    let key = MessageKey::new(-42, 9);
    seed_pending(&h.store, key);

    let outcome = h.workflow.handle_reaction(reaction(key, "guest")).await;

    assert_eq!(outcome, ReactionOutcome::Ignored(IgnoreReason::NotAdmin));
    assert_eq!(h.store.len(), 1);
    assert_eq!(h.store.get(&key).unwrap().draft, launch_draft());
    assert!(h.transport.texts().is_empty());
}

#[tokio::test]
async fn test_concurrent_approvals_publish_once() {
    let h = harness().await;
    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "gcal-2"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&h.google)
        .await;

    let key = MessageKey::new(-42, 11);
    seed_pending(&h.store, key);

    let (first, second) = tokio::join!(
        h.workflow.handle_reaction(reaction(key, "organizer")),
        h.workflow.handle_reaction(reaction(key, "@Organizer")),
    );

    let outcomes = [first, second];
    let published = outcomes
        .iter()
        .filter(|o| matches!(o, ReactionOutcome::Published { .. }))
        .count();
    let ignored = outcomes
        .iter()
        .filter(|o| **o == ReactionOutcome::Ignored(IgnoreReason::NotPending))
        .count();
    assert_eq!(published, 1);
    assert_eq!(ignored, 1);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_publish_failure_keeps_draft_for_retry() {
    let h = harness().await;
    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&h.google)
        .await;

    let key = MessageKey::new(-42, 13);
    seed_pending(&h.store, key);

    let outcome = h.workflow.handle_reaction(reaction(key, "organizer")).await;

    match outcome {
        ReactionOutcome::PublishFailed { error } => assert!(error.contains("500"), "{}", error),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(h.store.get(&key).unwrap().draft, launch_draft());
    assert!(h.transport.texts()[0].starts_with("Failed to add the event to the calendar"));

    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "gcal-3"})))
        .expect(1)
        .mount(&h.google)
        .await;

    let retry = h.workflow.handle_reaction(reaction(key, "organizer")).await;
    assert_eq!(
        retry,
        ReactionOutcome::Published {
            event_id: "gcal-3".to_string()
        }
    );
    assert!(h.store.is_empty());
}
