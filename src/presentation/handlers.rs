// HTTP request handlers
use crate::domain::dashboard::FleetSummary;
use crate::domain::device::DeviceKind;
use crate::domain::telemetry::TelemetryState;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::stream::Stream;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Snapshots buffered per stream client before new ones are dropped
const STREAM_BUFFER: usize = 32;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current telemetry state of a device
pub async fn get_snapshot(
    Path(kind): Path<DeviceKind>,
    State(state): State<Arc<AppState>>,
) -> Json<TelemetryState> {
    Json(state.registry.store(kind).snapshot())
}

/// Online and condition counts with averages across all devices
pub async fn get_summary(State(state): State<Arc<AppState>>) -> Json<FleetSummary> {
    Json(state.dashboard_service.summary())
}

pub async fn get_dashboard(
    Path(kind): Path<DeviceKind>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    Json(state.dashboard_service.dashboard(kind))
}

pub async fn get_series(
    Path((kind, field)): Path<(DeviceKind, String)>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    match state.dashboard_service.series(kind, &field) {
        Some(series) => Json(series).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            format!("{} has no field named {}", kind, field),
        )
            .into_response(),
    }
}

pub async fn connect(
    Path(kind): Path<DeviceKind>,
    State(state): State<Arc<AppState>>,
) -> Json<TelemetryState> {
    let controller = state.registry.controller(kind);
    controller.connect();
    Json(controller.store().snapshot())
}

pub async fn disconnect(
    Path(kind): Path<DeviceKind>,
    State(state): State<Arc<AppState>>,
) -> Json<TelemetryState> {
    let controller = state.registry.controller(kind);
    controller.disconnect();
    Json(controller.store().snapshot())
}

pub async fn toggle_source(
    Path(kind): Path<DeviceKind>,
    State(state): State<Arc<AppState>>,
) -> Json<TelemetryState> {
    let controller = state.registry.controller(kind);
    controller.toggle_source_mode();
    Json(controller.store().snapshot())
}

/// Server-sent events: the current snapshot, then one per store mutation
pub async fn stream_snapshots(
    Path(kind): Path<DeviceKind>,
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let store = state.registry.store(kind);
    let (tx, mut rx) = mpsc::channel::<TelemetryState>(STREAM_BUFFER);

    let subscription = store.subscribe(move |snapshot| {
        if tx.try_send(snapshot.clone()).is_err() {
            tracing::debug!(device = %snapshot.kind, "stream client lagging, snapshot dropped");
        }
    });
    let initial = store.snapshot();

    let stream = async_stream::stream! {
        // Dropped together with the stream when the client goes away
        let _subscription = subscription;
        yield snapshot_event(&initial);
        while let Some(snapshot) = rx.recv().await {
            yield snapshot_event(&snapshot);
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn snapshot_event(snapshot: &TelemetryState) -> Result<Event, axum::Error> {
    Event::default().event("snapshot").json_data(snapshot)
}
