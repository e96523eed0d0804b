//! Integration tests for the extraction pipeline and the HTTP service
//!
//! Pages are served by wiremock, the language model is stubbed and the
//! router is driven in-process with `oneshot`.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use linkcal::calendar::{CalendarPublisher, GoogleCalendarPublisher, StoredToken};
use linkcal::config::{CalendarConfig, Config};
use linkcal::extract::{LanguageModel, ModelRequest};
use linkcal::normalize::normalize;
use linkcal::pipeline::EventPipeline;
use linkcal::server::{create_router, AppState};
use linkcal::{DescriptionStyle, ExtractionError, PipelineError};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LAUNCH_PAGE: &str = r#"<html><head><title>Launch</title><script>var x = 1;</script></head>
<body><h1>Launch Party</h1><p>Join us June 1 2024 6pm at HQ</p></body></html>"#;

const FENCED_RESPONSE: &str = r#"Here is the JSON object you asked for:
```json
{
  "title": "Launch Party",
  "description": "Source: URL\n\nJoin us June 1 2024 6pm at HQ",
  "start_time": "2024-06-01T18:00:00-05:00",
  "end_time": "2024-06-01T21:00:00-05:00",
  "location": "HQ"
}
```"#;

/// Model stub that returns a canned answer and records prompts
struct StubModel {
    response: Result<String, String>,
    prompts: Mutex<Vec<ModelRequest>>,
}

impl StubModel {
    fn answering(text: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LanguageModel for StubModel {
    async fn complete(&self, request: &ModelRequest) -> Result<String, ExtractionError> {
        self.prompts.lock().unwrap().push(request.clone());
        self.response.clone().map_err(ExtractionError::Request)
    }
}

async fn page_server(body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/event"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    server
}

fn pipeline(model: Arc<StubModel>) -> EventPipeline {
    EventPipeline::with_model(&Config::default(), model).expect("Failed to build pipeline")
}

fn app(model: Arc<StubModel>, publisher: Option<Arc<dyn CalendarPublisher>>) -> axum::Router {
    create_router(AppState::new(pipeline(model), publisher))
}

async fn post_json(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post_raw(app, uri, Some("application/json"), body.to_string()).await
}

async fn post_raw(
    app: axum::Router,
    uri: &str,
    content_type: Option<&str>,
    body: String,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method("POST").uri(uri);
    if let Some(content_type) = content_type {
        request = request.header("content-type", content_type);
    }
    let request = request.body(Body::from(body)).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_launch_page_normalizes_to_two_lines() {
    assert_eq!(normalize(LAUNCH_PAGE), "Launch Party\n\nJoin us June 1 2024 6pm at HQ");
}

#[tokio::test]
async fn test_pipeline_end_to_end() {
    let server = page_server(LAUNCH_PAGE).await;
    let model = StubModel::answering(FENCED_RESPONSE);
    let url = format!("{}/event", server.uri());

    let parsed = pipeline(model.clone())
        .parse_event(&url, DescriptionStyle::Default)
        .await
        .expect("Pipeline should succeed");

    assert_eq!(parsed.draft.title, "Launch Party");
    assert_eq!(parsed.draft.location, "HQ");
    assert_eq!(parsed.draft.start_time, "2024-06-01T18:00:00-05:00");
    assert!(parsed.warnings.is_empty());

    let prompts = model.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].user.contains("Launch Party\n\nJoin us June 1 2024 6pm at HQ"));
    assert!(prompts[0].user.contains(&format!("Source: {}", url)));
    assert!(!prompts[0].user.contains("var x"));
}

#[tokio::test]
async fn test_pipeline_reports_empty_fields_as_warnings() {
    let server = page_server(LAUNCH_PAGE).await;
    let model = StubModel::answering(
        r#"{"title": "Launch Party", "description": "", "start_time": "2024-06-01T18:00:00Z",
            "end_time": "2024-06-01T21:00:00+00:00", "location": null}"#,
    );

    let parsed = pipeline(model)
        .parse_event(&format!("{}/event", server.uri()), DescriptionStyle::Telegram)
        .await
        .unwrap();

    assert_eq!(
        parsed.warnings,
        vec![
            "Empty value for field: description".to_string(),
            "Empty value for field: location".to_string(),
        ]
    );
    assert_eq!(parsed.draft.location, "");
}

#[tokio::test]
async fn test_pipeline_fetch_failure_skips_model() {
    let server = page_server(LAUNCH_PAGE).await;
    let model = StubModel::answering(FENCED_RESPONSE);

    let err = pipeline(model.clone())
        .parse_event(&format!("{}/missing", server.uri()), DescriptionStyle::Default)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Fetch(_)));
    assert!(model.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_parse_event_route_success() {
    let server = page_server(LAUNCH_PAGE).await;
    let app = app(StubModel::answering(FENCED_RESPONSE), None);

    let (status, body) = post_json(
        app,
        "/parse-event",
        json!({"url": format!("{}/event", server.uri()), "description_style": "telegram"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Launch Party");
    assert_eq!(body["end_time"], "2024-06-01T21:00:00-05:00");
    assert!(body.get("warnings").is_none());
}

#[tokio::test]
async fn test_parse_event_route_requires_url() {
    let app = app(StubModel::answering(FENCED_RESPONSE), None);

    let (status, body) = post_json(app.clone(), "/parse-event", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "URL is required");

    let (status, _) = post_json(app, "/parse-event", json!({"url": "   "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bad_request_bodies_get_json_errors() {
    let app = app(StubModel::answering(FENCED_RESPONSE), None);

    let (status, body) = post_raw(app.clone(), "/parse-event", Some("application/json"), "not json".into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request body");
    assert!(body["details"].is_string());

    let (status, body) = post_json(app.clone(), "/parse-event", json!({"url": 5})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Invalid request body");

    let (status, body) = post_raw(app, "/create-event", None, "{}".into()).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["error"], "Invalid request body");
}

#[tokio::test]
async fn test_parse_event_route_fetch_failure() {
    let server = page_server(LAUNCH_PAGE).await;
    let app = app(StubModel::answering(FENCED_RESPONSE), None);

    let (status, body) = post_json(app, "/parse-event", json!({"url": format!("{}/missing", server.uri())})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Failed to fetch webpage");
    assert!(body["details"].as_str().unwrap().contains("404"));
}

#[tokio::test]
async fn test_parse_event_route_malformed_model_output() {
    let server = page_server(LAUNCH_PAGE).await;
    let app = app(StubModel::answering("Sure!\n```json\n{\"title\": \n```"), None);

    let (status, body) = post_json(app, "/parse-event", json!({"url": format!("{}/event", server.uri())})).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["raw_response"], "Sure!\n```json\n{\"title\": \n```");
    assert_eq!(body["cleaned_response"], "{\"title\":");
    assert!(body["details"].is_string());
}

#[tokio::test]
async fn test_parse_event_route_validation_issues() {
    let server = page_server(LAUNCH_PAGE).await;
    let app = app(
        StubModel::answering(
            r#"{"description": "x", "start_time": "next friday", "end_time": "2024-06-01T21:00:00Z", "location": "HQ"}"#,
        ),
        None,
    );

    let (status, body) = post_json(app, "/parse-event", json!({"url": format!("{}/event", server.uri())})).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Event parsing issues detected");
    let issues: Vec<&str> = body["issues"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(issues[0], "Missing required field: title");
    assert!(issues[1].starts_with("Invalid start_time format"));
    assert_eq!(body["parsed_details"]["location"], "HQ");
}

#[tokio::test]
async fn test_parse_event_route_model_failure() {
    let server = page_server(LAUNCH_PAGE).await;
    let app = app(StubModel::failing("connection reset"), None);

    let (status, body) = post_json(app, "/parse-event", json!({"url": format!("{}/event", server.uri())})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["details"].as_str().unwrap().contains("connection reset"));
}

#[tokio::test]
async fn test_create_event_route() {
    let google = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendar/v3/calendars/primary/events"))
        .and(header("authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "gcal-42"})))
        .expect(1)
        .mount(&google)
        .await;

    let calendar = CalendarConfig {
        api_base: format!("{}/calendar/v3", google.uri()),
        ..CalendarConfig::default()
    };
    let token = StoredToken::new("token-1");
    let publisher: Arc<dyn CalendarPublisher> = Arc::new(GoogleCalendarPublisher::new(&calendar, token).unwrap());
    let app = app(StubModel::answering(FENCED_RESPONSE), Some(publisher));

    let (status, body) = post_json(
        app.clone(),
        "/create-event",
        json!({
            "title": "Launch Party",
            "description": "Party",
            "start_time": "2024-06-01T18:00:00-05:00",
            "end_time": "2024-06-01T21:00:00-05:00",
            "location": "HQ"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"eventId": "gcal-42"}));

    let (status, body) = post_json(app, "/create-event", json!({"title": "Launch Party"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid event details");
    assert_eq!(body["issues"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_create_event_route_without_calendar() {
    let app = app(StubModel::answering(FENCED_RESPONSE), None);

    let (status, body) = post_json(
        app,
        "/create-event",
        json!({
            "title": "Launch Party",
            "description": "Party",
            "start_time": "2024-06-01T18:00:00Z",
            "end_time": "2024-06-01T21:00:00Z",
            "location": "HQ"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Calendar is not configured");
}

#[tokio::test]
async fn test_health_route() {
    let app = app(StubModel::answering(FENCED_RESPONSE), None);
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"status": "ok", "calendar_configured": false}));
}
