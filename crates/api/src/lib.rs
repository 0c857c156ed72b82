mod rate_limit;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Json, State};
use axum::http::{Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{body::Body, Router};
use denta_bot::{BotConfig, CollectedActivities, ConfiguredBot, TurnOutcome};
use denta_core::{ConfigurationError, Participant};
use denta_observability::BotMetrics;
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

pub use crate::rate_limit::ClientRateLimiter;

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub api_key: String,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            api_key: "dev-denta-key".to_string(),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 120,
        }
    }
}

impl ApiSettings {
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let defaults = Self::default();

        let rate_limit_window = match env::var("DENTA_RATE_LIMIT_WINDOW_SECONDS") {
            Ok(value) => Duration::from_secs(parse_env("DENTA_RATE_LIMIT_WINDOW_SECONDS", &value)?),
            Err(_) => defaults.rate_limit_window,
        };
        let rate_limit_max = match env::var("DENTA_RATE_LIMIT_MAX") {
            Ok(value) => parse_env("DENTA_RATE_LIMIT_MAX", &value)?,
            Err(_) => defaults.rate_limit_max,
        };

        Ok(Self {
            api_key: env::var("DENTA_API_KEY")
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(defaults.api_key),
            rate_limit_window,
            rate_limit_max,
        })
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub bot: Arc<ConfiguredBot>,
    pub metrics: Arc<BotMetrics>,
    pub api_key: String,
    pub limiter: ClientRateLimiter,
}

impl ApiState {
    pub fn new(bot: ConfiguredBot, settings: ApiSettings) -> Self {
        let metrics = bot.metrics().clone();
        Self {
            bot: Arc::new(bot),
            metrics,
            api_key: settings.api_key,
            limiter: ClientRateLimiter::new(settings.rate_limit_window, settings.rate_limit_max),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    metrics: denta_observability::MetricsSnapshot,
}

/// Inbound activity as posted by the conversation channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundActivity {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub from: Option<Participant>,
    #[serde(default)]
    pub recipient: Option<Participant>,
    #[serde(default)]
    pub members_added: Vec<Participant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundActivity {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityResponse {
    pub activities: Vec<OutboundActivity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<TurnOutcome>,
}

pub async fn build_app() -> Result<Router> {
    let config = BotConfig::from_env().context("invalid bot configuration")?;
    let settings = ApiSettings::from_env().context("invalid api configuration")?;
    let bot = ConfiguredBot::from_config(&config, BotMetrics::shared())?;

    Ok(build_router(ApiState::new(bot, settings)))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/messages", post(messages))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        metrics: state.metrics.snapshot(),
    };
    (StatusCode::OK, Json(payload))
}

async fn messages(
    State(state): State<ApiState>,
    Json(activity): Json<InboundActivity>,
) -> Response {
    let ctx = CollectedActivities::new();

    let outcome = match activity.kind.as_str() {
        "message" => {
            let text = activity.text.as_deref().unwrap_or_default();
            Some(state.bot.on_message(&ctx, text).await)
        }
        "conversationUpdate" => {
            if activity.members_added.is_empty() {
                None
            } else {
                let Some(recipient) = activity.recipient.as_ref() else {
                    return error_response(
                        StatusCode::BAD_REQUEST,
                        "missing_recipient",
                        "conversationUpdate requires a recipient",
                    );
                };
                let greeted = state
                    .bot
                    .on_members_added(&ctx, &recipient.id, &activity.members_added)
                    .await;
                info!(greeted, "members added");
                None
            }
        }
        other => {
            info!(activity_type = %other, "ignoring activity");
            None
        }
    };

    let activities = ctx
        .into_messages()
        .into_iter()
        .map(|text| OutboundActivity {
            kind: "message".to_string(),
            id: Uuid::new_v4().to_string(),
            text,
            reply_to_id: activity.id.clone(),
        })
        .collect();

    (StatusCode::OK, Json(ActivityResponse { activities, outcome })).into_response()
}

async fn api_key_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let header_key = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if header_key != state.api_key {
        warn!(path = %request.uri().path(), "rejected request without valid api key");
        return error_response(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid x-api-key",
        );
    }

    next.run(request).await
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let client = request_ip(&request);
    if !state.limiter.allow(&client) {
        return error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "rate limit exceeded for this client",
        );
    }

    next.run(request).await
}

fn is_public_endpoint(path: &str) -> bool {
    matches!(path, "/health")
}

fn request_ip(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "local".to_string())
}

fn error_response(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": error,
            "message": message,
        })),
    )
        .into_response()
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigurationError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|err| ConfigurationError::Invalid {
            key: key.to_string(),
            message: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_conversation_update() {
        let activity: InboundActivity = serde_json::from_str(
            r#"{
                "type": "conversationUpdate",
                "recipient": { "id": "bot" },
                "membersAdded": [{ "id": "bot" }, { "id": "user-1", "name": "Dana" }]
            }"#,
        )
        .unwrap();
        assert_eq!(activity.kind, "conversationUpdate");
        assert_eq!(activity.members_added.len(), 2);
        assert_eq!(activity.members_added[1].name.as_deref(), Some("Dana"));
    }

    #[test]
    fn rejects_bad_numeric_settings() {
        assert!(parse_env::<usize>("DENTA_RATE_LIMIT_MAX", "lots").is_err());
        assert_eq!(parse_env::<u64>("DENTA_RATE_LIMIT_WINDOW_SECONDS", " 30 ").unwrap(), 30);
    }
}
