//! Pipeline and per-path control routes.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::error::AppError;
use super::AppContext;
use crate::pipeline::ToggleAction;

pub fn pipeline_routes() -> Router<AppContext> {
    Router::new()
        .route("/status", get(get_status))
        .route("/pipeline/start", post(start_pipeline))
        .route("/pipeline/stop", post(stop_pipeline))
        .route("/pipeline/restart", post(restart_pipeline))
        .route("/reload", post(reload))
        .route("/senders/:index/toggle", post(toggle_sender))
        .route("/senders/:index/weight", post(set_weight))
        .route("/preview", get(preview))
}

/// GET /api/status
async fn get_status(State(ctx): State<AppContext>) -> impl IntoResponse {
    let status = ctx.controller.get_status().await;
    let roles = status.roles();
    Json(json!({ "status": status, "roles": roles }))
}

/// POST /api/pipeline/start
async fn start_pipeline(State(ctx): State<AppContext>) -> Result<impl IntoResponse, AppError> {
    let report = ctx.controller.start_all().await?;
    let status = ctx.controller.get_status().await;
    Ok(Json(json!({ "report": report, "status": status })))
}

/// POST /api/pipeline/stop
async fn stop_pipeline(State(ctx): State<AppContext>) -> impl IntoResponse {
    ctx.controller.stop_all().await;
    Json(json!({ "status": ctx.controller.get_status().await }))
}

/// POST /api/pipeline/restart
async fn restart_pipeline(State(ctx): State<AppContext>) -> Result<impl IntoResponse, AppError> {
    let report = ctx.controller.restart_all().await?;
    let status = ctx.controller.get_status().await;
    Ok(Json(json!({ "report": report, "status": status })))
}

/// POST /api/reload
async fn reload(State(ctx): State<AppContext>) -> Result<impl IntoResponse, AppError> {
    let report = ctx.controller.reload_from_store().await?;
    let status = ctx.controller.get_status().await;
    Ok(Json(json!({ "report": report, "status": status })))
}

#[derive(Deserialize)]
struct ToggleRequest {
    #[serde(default = "default_action")]
    action: ToggleAction,
}

fn default_action() -> ToggleAction {
    ToggleAction::Toggle
}

/// POST /api/senders/:index/toggle
async fn toggle_sender(
    State(ctx): State<AppContext>,
    Path(index): Path<usize>,
    Json(req): Json<ToggleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let enabled = ctx.controller.toggle_sender(index, req.action).await?;
    let status = ctx.controller.get_status().await;
    Ok(Json(json!({
        "index": index,
        "enabled": enabled,
        "sender": status.sender(index),
    })))
}

#[derive(Deserialize)]
struct WeightRequest {
    weight: i64,
}

/// POST /api/senders/:index/weight
async fn set_weight(
    State(ctx): State<AppContext>,
    Path(index): Path<usize>,
    Json(req): Json<WeightRequest>,
) -> Result<impl IntoResponse, AppError> {
    ctx.controller.set_sender_weight(index, req.weight).await?;
    let status = ctx.controller.get_status().await;
    Ok(Json(json!({
        "index": index,
        "weight": req.weight,
        "sender": status.sender(index),
    })))
}

/// GET /api/preview
async fn preview(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let config = ctx.controller.store().load()?;
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|h| h.to_str().ok());
    Ok(Json(json!({ "url": config.preview_url(host) })))
}
