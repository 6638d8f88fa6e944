// HTTP request handlers
use crate::application::dashboard_service::SaveOutcome;
use crate::application::error::DashboardError;
use crate::domain::dashboard::WidgetModification;
use crate::domain::error::DomainError;
use crate::domain::window_ops::WindowAction;
use crate::infrastructure::chunked_json::stream_from_receiver;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct LoadRequest {
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct SaveAsRequest {
    pub name: String,
}

#[derive(Serialize)]
struct SaveResponse {
    outcome: SaveOutcome,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Status code for a session error
pub fn error_status(err: &DashboardError) -> StatusCode {
    match err {
        DashboardError::Domain(DomainError::WidgetNotFound(_)) => StatusCode::NOT_FOUND,
        DashboardError::Domain(DomainError::SensorLimitExceeded { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        DashboardError::DashboardNotFound(_) => StatusCode::NOT_FOUND,
        DashboardError::NameTaken(_) => StatusCode::CONFLICT,
        DashboardError::Persistence(_) => StatusCode::BAD_GATEWAY,
    }
}

async fn respond<T: Serialize>(
    result: Result<T, DashboardError>,
    headers: &HeaderMap,
) -> Response {
    let compress = accepts_brotli(headers);
    let built = match result {
        Ok(value) => json_response(&value, StatusCode::OK, compress).await,
        Err(err) => {
            let status = error_status(&err);
            if status.is_server_error() {
                tracing::error!("Request failed: {:#}", err);
            } else {
                tracing::debug!("Request rejected: {}", err);
            }
            let body = ErrorBody {
                error: err.to_string(),
            };
            json_response(&body, status, compress).await
        }
    };

    match built {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current dashboard with all widget windows
pub async fn get_dashboard(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let dashboard = state.dashboard_service.snapshot().await;
    respond(Ok(dashboard), &headers).await
}

pub async fn load_dashboard(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoadRequest>,
) -> Response {
    let result = state
        .dashboard_service
        .load(request.name.as_deref())
        .await;
    respond(result, &headers).await
}

/// Save under the current name; a missing dashboard asks the client for save-as
pub async fn save_dashboard(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let result = state
        .dashboard_service
        .save()
        .await
        .map(|outcome| SaveResponse { outcome });
    respond(result, &headers).await
}

pub async fn save_dashboard_as(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(request): Json<SaveAsRequest>,
) -> Response {
    let result = state
        .dashboard_service
        .save_as(&request.name)
        .await
        .map(|()| SaveResponse {
            outcome: SaveOutcome::Saved,
        });
    respond(result, &headers).await
}

/// Structural dashboard change; unknown modification types are rejected by the extractor
pub async fn modify_dashboard(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(modification): Json<WidgetModification>,
) -> Response {
    let result = state.dashboard_service.modify(modification).await;
    respond(result, &headers).await
}

pub async fn get_widget(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let result = state.dashboard_service.widget(&id).await;
    respond(result, &headers).await
}

pub async fn widget_window_action(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(action): Json<WindowAction>,
) -> Response {
    let result = state
        .dashboard_service
        .apply_window_action(&id, action)
        .await;
    respond(result, &headers).await
}

pub async fn refresh_widget(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let result = state.dashboard_service.refresh(&id).await;
    respond(result, &headers).await
}

/// Stream dashboard change events (chunked, length-prefixed JSON)
pub async fn stream_events(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let rx = state.dashboard_service.subscribe();
    stream_from_receiver(rx, accepts_brotli(&headers)).await
}
