use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use save_export_core::format_size;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::export::{ExportDraft, ExportFlowError, ExportPhase};
use crate::notice::Notice;
use crate::summary::SummaryPanel;
use crate::tab::ExportTab;
use crate::table::{TableRow, TableView};

#[derive(Clone)]
pub struct AppState {
    pub tab: Arc<ExportTab>,
    pub api_token: Option<String>,
}

// --- Template view models ---

struct SummaryItem {
    succeeded: usize,
    destination: String,
    total_size: String,
    failure_message: String,
    show_failures: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
struct IndexTemplate {
    rows: Vec<TableRow>,
    loading: bool,
    all_selected: bool,
    selected_count: usize,
    selected_size: String,
    exporting: bool,
    summary: Option<SummaryItem>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/v1/healthz", get(healthz))
        .route("/api/v1/table", get(api_table))
        .route("/api/v1/table/refresh", post(api_refresh))
        .route("/api/v1/table/rows/{id}/select", post(api_select_row))
        .route("/api/v1/table/select-all", post(api_select_all))
        .route("/api/v1/export", get(api_export_phase).post(api_export_begin))
        .route("/api/v1/export/destination", post(api_export_destination))
        .route("/api/v1/export/confirm", post(api_export_confirm))
        .route("/api/v1/export/cancel", post(api_export_cancel))
        .route("/api/v1/summary", get(api_summary))
        .route("/api/v1/summary/learn-more", post(api_summary_learn_more))
        .route("/api/v1/summary/dismiss", post(api_summary_dismiss))
        .route("/api/v1/notices", get(api_notices))
        .route("/api/v1/events/update-export-table", post(api_update_export_table))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthzResponse {
    status: &'static str,
}

async fn healthz() -> Json<HealthzResponse> {
    Json(HealthzResponse { status: "ok" })
}

fn require_api_auth(state: &AppState, headers: &HeaderMap) -> Result<(), StatusCode> {
    let Some(expected) = &state.api_token else {
        return Ok(());
    };

    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == expected => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

fn flow_status(err: &ExportFlowError) -> StatusCode {
    match err {
        ExportFlowError::NoSelection | ExportFlowError::EmptyDestination => StatusCode::BAD_REQUEST,
        ExportFlowError::Blocked | ExportFlowError::NotConfiguring => StatusCode::CONFLICT,
        ExportFlowError::Backend(e) => {
            error!(error = %e, "export flow backend call failed");
            StatusCode::BAD_GATEWAY
        }
    }
}

#[derive(Debug, Serialize)]
struct TableResponse {
    #[serde(flatten)]
    view: TableView,
    all_selected: bool,
    selected_count: usize,
    selected_size: u64,
}

impl From<TableView> for TableResponse {
    fn from(view: TableView) -> Self {
        Self {
            all_selected: view.all_selected(),
            selected_count: view.selected_count(),
            selected_size: view.selected_size(),
            view,
        }
    }
}

async fn api_table(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TableResponse>, StatusCode> {
    require_api_auth(&state, &headers)?;
    Ok(Json(state.tab.table.view().await.into()))
}

async fn api_refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TableResponse>, StatusCode> {
    require_api_auth(&state, &headers)?;
    state
        .tab
        .table
        .refresh(true)
        .await
        .map_err(|_| StatusCode::BAD_GATEWAY)?;
    Ok(Json(state.tab.table.view().await.into()))
}

#[derive(Debug, Deserialize)]
struct SelectRequest {
    selected: bool,
}

async fn api_select_row(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SelectRequest>,
) -> Result<StatusCode, StatusCode> {
    require_api_auth(&state, &headers)?;
    if state.tab.table.set_selected(&id, req.selected).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn api_select_all(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SelectRequest>,
) -> Result<StatusCode, StatusCode> {
    require_api_auth(&state, &headers)?;
    state.tab.table.select_all(req.selected).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn api_export_phase(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ExportPhase>, StatusCode> {
    require_api_auth(&state, &headers)?;
    Ok(Json(state.tab.export.phase().await))
}

async fn api_export_begin(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ExportDraft>, StatusCode> {
    require_api_auth(&state, &headers)?;
    state
        .tab
        .export
        .begin()
        .await
        .map(Json)
        .map_err(|e| flow_status(&e))
}

async fn api_export_destination(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Option<String>>, StatusCode> {
    require_api_auth(&state, &headers)?;
    state
        .tab
        .export
        .select_destination()
        .await
        .map(Json)
        .map_err(|e| flow_status(&e))
}

#[derive(Debug, Deserialize)]
struct ConfirmRequest {
    #[serde(default)]
    count: String,
    #[serde(default)]
    destination: String,
}

async fn api_export_confirm(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ConfirmRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    require_api_auth(&state, &headers)?;
    let job = state
        .tab
        .export
        .confirm(&req.count, &req.destination)
        .await
        .map_err(|e| flow_status(&e))?;

    let job_id = job.id;
    let tab = state.tab.clone();
    tokio::spawn(async move {
        tab.export.run(job).await;
    });
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "job_id": job_id })),
    ))
}

async fn api_export_cancel(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, StatusCode> {
    require_api_auth(&state, &headers)?;
    if state.tab.export.cancel().await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::CONFLICT)
    }
}

async fn api_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SummaryPanel>, StatusCode> {
    require_api_auth(&state, &headers)?;
    Ok(Json(state.tab.summary.panel().await))
}

async fn api_summary_learn_more(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Notice>, StatusCode> {
    require_api_auth(&state, &headers)?;
    state
        .tab
        .summary
        .learn_more()
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn api_summary_dismiss(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, StatusCode> {
    require_api_auth(&state, &headers)?;
    let dismissed = state.tab.summary.dismiss().await;
    Ok(Json(serde_json::json!({ "dismissed": dismissed })))
}

async fn api_notices(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Notice>>, StatusCode> {
    require_api_auth(&state, &headers)?;
    Ok(Json(state.tab.notices.drain().await))
}

async fn api_update_export_table(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, StatusCode> {
    require_api_auth(&state, &headers)?;
    let tab = state.tab.clone();
    tokio::spawn(async move {
        if let Err(e) = tab.on_update_export_table().await {
            warn!(error = %e, "pushed table refresh failed");
        }
    });
    Ok(StatusCode::ACCEPTED)
}

async fn index(State(state): State<AppState>) -> IndexTemplate {
    let view = state.tab.table.view().await;
    let panel = state.tab.summary.panel().await;
    let exporting = matches!(state.tab.export.phase().await, ExportPhase::Running { .. });

    let summary = panel
        .view
        .filter(|_| panel.visible)
        .map(|s| SummaryItem {
            succeeded: s.result.succeeded,
            destination: s.result.destination.clone(),
            total_size: s.total_size_display.clone(),
            show_failures: s.failure_region_visible(),
            failure_message: s.failure_message.unwrap_or_default(),
        });

    IndexTemplate {
        all_selected: view.all_selected(),
        selected_count: view.selected_count(),
        selected_size: format_size(view.selected_size()),
        loading: view.loading,
        rows: view.rows,
        exporting,
        summary,
    }
}
