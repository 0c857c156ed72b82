use std::path::PathBuf;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use denta_api::{build_router, ActivityResponse, ApiSettings, ApiState};
use denta_bot::{BotConfig, ConfiguredBot, SCHEDULER_UNAVAILABLE_TEXT};
use denta_core::{RoutingDecision, NO_ANSWER_TEXT, WELCOME_TEXT};
use denta_observability::BotMetrics;
use serde_json::{json, Value};
use tower::ServiceExt;

const API_KEY: &str = "test-key";

fn kb_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../kb")
}

fn app_with(config: BotConfig, settings: ApiSettings) -> Router {
    let bot = ConfiguredBot::from_config(&config, BotMetrics::shared()).expect("bot should build");
    build_router(ApiState::new(bot, settings))
}

fn app() -> Router {
    app_with(
        BotConfig {
            kb_root: kb_root(),
            ..BotConfig::default()
        },
        ApiSettings {
            api_key: API_KEY.to_string(),
            ..ApiSettings::default()
        },
    )
}

fn post_activity(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/messages")
        .header("content-type", "application/json")
        .header("x-api-key", API_KEY)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn message(text: &str) -> Value {
    json!({
        "type": "message",
        "id": "activity-1",
        "text": text,
        "from": { "id": "user-1" },
        "recipient": { "id": "denta-bot" }
    })
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, parsed)
}

fn texts(body: &Value) -> Vec<String> {
    let response: ActivityResponse = serde_json::from_value(body.clone()).unwrap();
    response
        .activities
        .into_iter()
        .map(|activity| activity.text)
        .collect()
}

#[tokio::test]
async fn health_is_public() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn messages_require_api_key() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/messages")
        .header("content-type", "application/json")
        .body(Body::from(message("hello").to_string()))
        .unwrap();

    let (status, _) = send(app(), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn availability_question_lists_slots_for_the_date() {
    let (status, body) = send(app(), post_activity(message("What times are open tomorrow?"))).await;

    assert_eq!(status, StatusCode::OK);
    let replies = texts(&body);
    assert_eq!(replies.len(), 1);
    assert!(replies[0].starts_with("Current time slots available: "));
    assert!(replies[0].ends_with(" for tomorrow"));
    assert_eq!(body["outcome"]["decision"]["action"], "check_availability");
    assert_eq!(body["activities"][0]["replyToId"], "activity-1");
}

#[tokio::test]
async fn booking_returns_confirmation() {
    let (status, body) = send(app(), post_activity(message("Book me at 3pm"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(texts(&body), vec!["An appointment is set for 3pm.".to_string()]);
}

#[tokio::test]
async fn booking_without_time_answers_instead() {
    let (_, body) = send(app(), post_activity(message("I want to book an appointment"))).await;

    let outcome: denta_bot::TurnOutcome = serde_json::from_value(body["outcome"].clone()).unwrap();
    assert!(!matches!(
        outcome.decision,
        RoutingDecision::ScheduleAppointment { .. }
    ));
    assert_eq!(texts(&body).len(), 1);
}

#[tokio::test]
async fn faq_question_is_answered_from_the_knowledge_base() {
    let (_, body) = send(app(), post_activity(message("Do you accept insurance?"))).await;

    assert_eq!(
        texts(&body),
        vec!["We accept most major dental insurance plans. Bring your card to your first visit."
            .to_string()]
    );
}

#[tokio::test]
async fn unknown_question_gets_fixed_fallback() {
    let (_, body) = send(app(), post_activity(message("Can you recommend a good novel?"))).await;

    assert_eq!(texts(&body), vec![NO_ANSWER_TEXT.to_string()]);
    assert_eq!(body["outcome"]["decision"]["action"], "fallback");
}

#[tokio::test]
async fn new_member_is_welcomed_but_not_the_bot() {
    let activity = json!({
        "type": "conversationUpdate",
        "recipient": { "id": "denta-bot" },
        "membersAdded": [{ "id": "denta-bot" }, { "id": "user-7" }]
    });

    let (status, body) = send(app(), post_activity(activity)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(texts(&body), vec![WELCOME_TEXT.to_string()]);
}

#[tokio::test]
async fn conversation_update_without_recipient_is_rejected() {
    let activity = json!({
        "type": "conversationUpdate",
        "membersAdded": [{ "id": "user-7" }]
    });

    let (status, _) = send(app(), post_activity(activity)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn other_activity_types_are_ignored() {
    let (status, body) = send(app(), post_activity(json!({ "type": "typing" }))).await;

    assert_eq!(status, StatusCode::OK);
    assert!(texts(&body).is_empty());
}

#[tokio::test]
async fn unreachable_scheduler_degrades_the_reply() {
    let app = app_with(
        BotConfig {
            kb_root: kb_root(),
            scheduler_url: Some("http://127.0.0.1:9/".to_string()),
            ..BotConfig::default()
        },
        ApiSettings {
            api_key: API_KEY.to_string(),
            ..ApiSettings::default()
        },
    );

    let (status, body) = send(app, post_activity(message("Book me at 3pm"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(texts(&body), vec![SCHEDULER_UNAVAILABLE_TEXT.to_string()]);
    assert_eq!(body["outcome"]["degraded"], true);
}

#[tokio::test]
async fn rate_limit_applies_per_client() {
    let app = app_with(
        BotConfig {
            kb_root: kb_root(),
            ..BotConfig::default()
        },
        ApiSettings {
            api_key: API_KEY.to_string(),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 1,
        },
    );

    let anonymous = Request::builder()
        .method("POST")
        .uri("/api/messages")
        .header("content-type", "application/json")
        .body(Body::from(message("hello").to_string()))
        .unwrap();
    let (rejected, _) = send(app.clone(), anonymous).await;
    let (first, _) = send(app.clone(), post_activity(message("hello"))).await;
    let (second, _) = send(app, post_activity(message("hello again"))).await;

    assert_eq!(rejected, StatusCode::UNAUTHORIZED);
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn long_message_still_gets_one_reply() {
    let text = "a".repeat(2_001);

    let (status, body) = send(app(), post_activity(message(&text))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(texts(&body), vec![NO_ANSWER_TEXT.to_string()]);
}
