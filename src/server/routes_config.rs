//! Raw configuration document routes.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;

use super::error::AppError;
use super::AppContext;

pub fn config_routes() -> Router<AppContext> {
    Router::new().route("/config", get(get_config).put(put_config))
}

/// GET /api/config
async fn get_config(State(ctx): State<AppContext>) -> Result<impl IntoResponse, AppError> {
    let text = ctx.controller.store().load_text()?;
    Ok(([(header::CONTENT_TYPE, "application/yaml; charset=utf-8")], text))
}

/// PUT /api/config
///
/// The body is the full YAML document. It is validated before being saved;
/// on success the whole pipeline restarts from it.
async fn put_config(
    State(ctx): State<AppContext>,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    let report = ctx.controller.save_and_restart_all(&body).await?;
    let status = ctx.controller.get_status().await;
    Ok(Json(json!({ "report": report, "status": status })))
}
