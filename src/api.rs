//! Inbound HTTP surface: status proxy, push subscription management, and the
//! static browser client.

use crate::core::{PushSubscription, StatusSource};
use crate::extract::extract;
use crate::registry::{RegistryError, SubscriptionRegistry};
use crate::station::FetchError;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn StatusSource>,
    pub registry: SubscriptionRegistry,
    pub push_enabled: bool,
    pub public_key: String,
}

/// Builds the full router, including the static file fallback.
pub fn router(state: AppState, public_dir: &Path) -> Router {
    let static_files = ServeDir::new(public_dir)
        .fallback(ServeFile::new(public_dir.join("index.html")));

    Router::new()
        .route("/api/status", get(station_status))
        .route("/api/push-config", get(push_config))
        .route("/api/subscribe", post(subscribe))
        .route("/api/unsubscribe", post(unsubscribe))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusSummary {
    status: String,
    /// False when no status field was found; such a poll never counts as a change.
    status_known: bool,
    connectors_text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    ok: bool,
    fetched_at: String,
    data: Value,
    summary: StatusSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PushConfigResponse {
    enabled: bool,
    public_key: String,
}

#[derive(Debug, Serialize)]
struct OkResponse {
    ok: bool,
}

impl OkResponse {
    fn ok() -> Json<Self> {
        Json(Self { ok: true })
    }
}

/// Body of every failed API call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    ok: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<String>,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: error.into(),
            name: None,
            status: None,
            status_text: None,
            body: None,
        }
    }
}

/// Errors surfaced to HTTP clients.
#[derive(Debug)]
pub enum ApiError {
    /// The upstream station fetch failed.
    Station(FetchError),
    /// 400 - the request body was unusable.
    BadRequest(String),
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        ApiError::Station(err)
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidSubscription(message) => ApiError::BadRequest(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, body) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, ErrorResponse::new(message)),
            ApiError::Station(err) => {
                let mut body = ErrorResponse::new(err.to_string());
                body.name = Some(err.name());
                let code = match err {
                    FetchError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                    FetchError::StationUnreachable {
                        status,
                        status_text,
                        body: upstream_body,
                    } => {
                        body.status = Some(status);
                        body.status_text = Some(status_text);
                        body.body = Some(upstream_body);
                        StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY)
                    }
                    FetchError::Transport(_) | FetchError::MalformedBody(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (code, body)
            }
        };
        (code, Json(body)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /api/status`: fetches the station once, on demand.
async fn station_status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let snapshot = state.source.fetch().await?;
    let extracted = extract(&snapshot.raw_payload);

    Ok(Json(StatusResponse {
        ok: true,
        fetched_at: snapshot.fetched_at.to_rfc3339(),
        summary: StatusSummary {
            status: extracted.display_status().to_string(),
            status_known: extracted.status_label.is_some(),
            connectors_text: extracted.connectors_summary,
        },
        data: snapshot.raw_payload,
    }))
}

/// `GET /api/push-config`
async fn push_config(State(state): State<AppState>) -> Json<PushConfigResponse> {
    Json(PushConfigResponse {
        enabled: state.push_enabled,
        public_key: state.public_key.clone(),
    })
}

/// `POST /api/subscribe`
async fn subscribe(State(state): State<AppState>, body: Bytes) -> Result<Json<OkResponse>, ApiError> {
    let subscription: PushSubscription = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid subscription: {}", e)))?;
    let endpoint = subscription.endpoint.clone();
    state.registry.add(subscription)?;
    info!(endpoint = %endpoint, total = state.registry.len(), "Registered push subscription");
    Ok(OkResponse::ok())
}

#[derive(Debug, Deserialize, Default)]
struct UnsubscribeRequest {
    #[serde(default)]
    endpoint: Option<String>,
}

/// `POST /api/unsubscribe`: always succeeds, even for unknown endpoints.
async fn unsubscribe(State(state): State<AppState>, body: Bytes) -> Json<OkResponse> {
    let request: UnsubscribeRequest = serde_json::from_slice(&body).unwrap_or_else(|e| {
        warn!(error = %e, "Ignoring unreadable unsubscribe body");
        UnsubscribeRequest::default()
    });
    if let Some(endpoint) = request.endpoint {
        if state.registry.remove(&endpoint) {
            info!(endpoint = %endpoint, "Push subscription removed by client");
        }
    }
    OkResponse::ok()
}
