//! REST API and SSE routes

use crate::manager::{self, SessionError};
use crate::orchestrator::{MetricsSource, TelemetrySource};
use crate::state::AppState;
use crate::strategy::AppliedStrategy;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{Stream, StreamExt as FuturesStreamExt};
use pitwall_core::model::FieldMask;
use pitwall_core::{DriverProfile, RaceMetrics, TelemetryPoint};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

type ApiError = (StatusCode, String);

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/drivers", get(list_drivers))
        .route("/api/drivers/select", post(select_driver))
        .route("/api/race/control", post(race_control))
        .route("/api/status", get(status))
        .route("/api/telemetry/history", get(telemetry_history))
        .route("/api/telemetry/stream", get(telemetry_stream))
        .route("/api/metrics", get(metrics))
        .route("/api/strategy", get(strategy))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Driver Endpoints ===

async fn list_drivers(State(state): State<AppState>) -> Json<Vec<DriverProfile>> {
    Json(state.drivers.as_ref().clone())
}

#[derive(Deserialize)]
struct SelectDriverRequest {
    driver_id: String,
}

async fn select_driver(
    State(state): State<AppState>,
    Json(request): Json<SelectDriverRequest>,
) -> Result<Json<DriverProfile>, ApiError> {
    manager::select_driver(&state, &request.driver_id)
        .await
        .map(Json)
        .map_err(|e| match e {
            SessionError::UnknownDriver(_) => (StatusCode::NOT_FOUND, e.to_string()),
        })
}

// === Race Control ===

#[derive(Deserialize)]
struct RaceControlRequest {
    action: String,
}

async fn race_control(
    State(state): State<AppState>,
    Json(request): Json<RaceControlRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match request.action.as_str() {
        "start" => {
            let started = manager::start(&state).await;
            Ok(Json(serde_json::json!({"status": "racing", "changed": started})))
        }
        "pause" => {
            manager::pause(&state).await;
            Ok(Json(serde_json::json!({"status": "paused"})))
        }
        "reset" => {
            manager::reset(&state).await;
            Ok(Json(serde_json::json!({"status": "reset"})))
        }
        _ => Err((
            StatusCode::BAD_REQUEST,
            format!("Unknown action: {}", request.action),
        )),
    }
}

// === Status ===

#[derive(Serialize)]
struct StatusResponse {
    racing: bool,
    driver: DriverProfile,
    telemetry_source: TelemetrySource,
    metrics_source: MetricsSource,
    recorded_frames: usize,
    history_len: usize,
    frames_emitted: u64,
    strategy_available: bool,
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let racing = manager::is_racing(&state).await;
    let status = state.orchestrator.lock().await.status();

    Json(StatusResponse {
        racing,
        driver: status.driver,
        telemetry_source: status.telemetry_source,
        metrics_source: status.metrics_source,
        recorded_frames: status.recorded_frames,
        history_len: status.history_len,
        frames_emitted: status.frames_emitted,
        strategy_available: state.strategy.current().is_some(),
    })
}

// === Telemetry ===

async fn telemetry_history(State(state): State<AppState>) -> Json<Vec<TelemetryPoint>> {
    Json(state.orchestrator.lock().await.history())
}

#[derive(Deserialize)]
struct StreamQuery {
    fields: Option<String>,
}

async fn telemetry_stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    let field_mask = query.fields.map(|f| FieldMask::parse(&f));

    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let mask = field_mask.clone();
        async move {
            match result {
                Ok(point) => match point.to_json_filtered(mask.as_ref()) {
                    Ok(json) => Some(Ok(Event::default().data(json))),
                    Err(e) => {
                        tracing::error!("Failed to serialize telemetry point: {}", e);
                        None
                    }
                },
                Err(e) => {
                    tracing::warn!("Broadcast stream error: {}", e);
                    None
                }
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// === Metrics & Strategy ===

#[derive(Serialize)]
struct MetricsResponse {
    metrics: RaceMetrics,
    source: MetricsSource,
}

async fn metrics(State(state): State<AppState>) -> Result<Json<MetricsResponse>, ApiError> {
    let orchestrator = state.orchestrator.lock().await;
    orchestrator
        .metrics()
        .map(|metrics| {
            Json(MetricsResponse {
                metrics,
                source: orchestrator.metrics_source(),
            })
        })
        .ok_or((StatusCode::NOT_FOUND, "No metrics yet".to_string()))
}

async fn strategy(State(state): State<AppState>) -> Result<Json<AppliedStrategy>, ApiError> {
    state
        .strategy
        .current()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "No strategy yet".to_string()))
}
