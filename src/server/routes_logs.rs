//! Per-process log tail.

use std::io::{Read, Seek, SeekFrom};
use std::path::Path as FsPath;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use ristbond_core::{Error, Result};
use serde::Deserialize;

use super::error::AppError;
use super::AppContext;

/// Only this much of the end of a log is read.
const TAIL_WINDOW: u64 = 64 * 1024;
const DEFAULT_LINES: usize = 200;
const MAX_LINES: usize = 10_000;

pub fn log_routes() -> Router<AppContext> {
    Router::new().route("/logs/:name", get(tail_log))
}

#[derive(Deserialize)]
struct TailQuery {
    n: Option<usize>,
}

/// Keep only characters that are safe in a log file name.
fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// Last `lines` lines of the final [`TAIL_WINDOW`] bytes of `path`.
fn tail(path: &FsPath, lines: usize) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    let len = file.metadata()?.len();
    let start = len.saturating_sub(TAIL_WINDOW);
    file.seek(SeekFrom::Start(start))?;

    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    let text = String::from_utf8_lossy(&buf);

    let all: Vec<&str> = text.lines().collect();
    // A window that starts mid-file begins with a partial line.
    let skip_partial = usize::from(start > 0 && all.len() > 1);
    let body = &all[skip_partial..];
    let from = body.len().saturating_sub(lines);
    let mut out = body[from..].join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    Ok(out)
}

/// GET /api/logs/:name?n=
async fn tail_log(
    State(ctx): State<AppContext>,
    Path(name): Path<String>,
    Query(query): Query<TailQuery>,
) -> std::result::Result<impl IntoResponse, AppError> {
    let safe = sanitize(&name);
    if safe.is_empty() {
        return Err(Error::not_found("log", name).into());
    }
    let lines = query.n.unwrap_or(DEFAULT_LINES).clamp(1, MAX_LINES);
    let path = ctx.controller.supervisor().log_path(&safe);

    // File reads stay off the runtime threads.
    let text = tokio::task::spawn_blocking(move || {
        if path.exists() {
            tail(&path, lines).map(Some)
        } else {
            Ok(None)
        }
    })
    .await
    .map_err(|e| Error::Internal(format!("log tail task failed: {e}")))??
    .ok_or_else(|| Error::not_found("log", safe))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text))
}
