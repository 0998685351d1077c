//! HTTP transport
//!
//! axum routes for the command endpoint and the Server-Sent Events stream:
//! - `GET  /api/timers/events?timerId=ID`: stream of `update` events
//! - `GET  /api/timers/state?timerId=ID`: current snapshot
//! - `POST /api/timers/start` with `{"timerId", "duration"}`
//! - `POST /api/timers/reset` with `{"timerId"}`
//! - `GET  /health`
//!
//! Invalid input is answered with 400 and `{"statusCode", "statusMessage"}`.

use std::io;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::timer::duration::parse_duration;
use crate::timer::{Snapshot, TimerHub};
use crate::transport::message::{CommandResponse, ResetRequest, StartRequest, TimerQuery};
use crate::utils::TimerError;
use crate::utils::error::require_timer_id;

/// Name of the SSE event carrying a snapshot.
pub const UPDATE_EVENT: &str = "update";

#[derive(Clone)]
struct AppState {
    hub: TimerHub,
    started_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    timers: usize,
    started_at: String,
}

impl IntoResponse for TimerError {
    fn into_response(self) -> Response {
        warn!(error = %self, "rejected request");
        let body = json!({
            "statusCode": StatusCode::BAD_REQUEST.as_u16(),
            "statusMessage": self.to_string(),
        });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

pub fn router(hub: TimerHub) -> Router {
    let state = AppState {
        hub,
        started_at: Utc::now(),
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/timers/events", get(events_handler))
        .route("/api/timers/state", get(state_handler))
        .route("/api/timers/start", post(start_handler))
        .route("/api/timers/reset", post(reset_handler))
        .with_state(state)
}

pub async fn start_http_server(addr: String, hub: TimerHub) -> io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on http://{addr}");
    serve(listener, hub).await
}

pub async fn serve(listener: TcpListener, hub: TimerHub) -> io::Result<()> {
    axum::serve(listener, router(hub)).await
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timers: state.hub.timer_count(),
        started_at: state.started_at.to_rfc3339(),
    })
}

/// GET /api/timers/events
///
/// The subscription lives inside the response stream; when the client goes
/// away the stream is dropped and the subscriber detaches.
async fn events_handler(
    State(state): State<AppState>,
    Query(query): Query<TimerQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, TimerError> {
    let subscription = state
        .hub
        .subscribe(query.timer_id.as_deref().unwrap_or_default())?;

    let events = stream::unfold(subscription, |mut subscription| async move {
        let snapshot = subscription.recv().await?;
        let event = Event::default().event(UPDATE_EVENT).json_data(snapshot);
        Some((event, subscription))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// GET /api/timers/state
async fn state_handler(
    State(state): State<AppState>,
    Query(query): Query<TimerQuery>,
) -> Result<Json<Snapshot>, TimerError> {
    let snapshot = state
        .hub
        .snapshot(query.timer_id.as_deref().unwrap_or_default())?;
    Ok(Json(snapshot))
}

/// POST /api/timers/start
async fn start_handler(
    State(state): State<AppState>,
    Json(request): Json<StartRequest>,
) -> Result<Json<CommandResponse>, TimerError> {
    let timer_id = request.timer_id.unwrap_or_default();
    require_timer_id(&timer_id)?;
    let duration = parse_duration(&request.duration)?;

    state.hub.start(&timer_id, duration)?;
    Ok(Json(CommandResponse::ok()))
}

/// POST /api/timers/reset
async fn reset_handler(
    State(state): State<AppState>,
    Json(request): Json<ResetRequest>,
) -> Result<Json<CommandResponse>, TimerError> {
    let timer_id = request.timer_id.unwrap_or_default();

    state.hub.reset(&timer_id)?;
    Ok(Json(CommandResponse::ok()))
}
