//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, AppError>` and use `?` on
//! [`ristbond_core::Error`] values directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ristbond_core::Error;
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError(pub Error);

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl AppError {
    fn code(&self) -> &'static str {
        match &self.0 {
            Error::Config(_) => "config_error",
            Error::InvalidConfig(_) => "invalid_config",
            Error::Validation(_) => "validation_error",
            Error::UnsupportedIngestKind(_) => "unsupported_ingest_kind",
            Error::NoEnabledSenders => "no_enabled_senders",
            Error::BadIndex { .. } => "bad_index",
            Error::SenderDisabled(_) => "sender_disabled",
            Error::RestartRequired(_) => "restart_required",
            Error::WeightOutOfRange(_) => "weight_out_of_range",
            Error::LaunchFailure { .. } => "launch_failure",
            Error::NotFound { .. } => "not_found",
            Error::Io { .. } => "io_error",
            Error::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "Server error in API handler");
        } else {
            tracing::debug!(status = %status, error = %self.0, "Request rejected");
        }

        let mut body = json!({
            "error": self.0.to_string(),
            "code": self.code(),
        });
        if let Error::Validation(ref problems) = self.0 {
            body["problems"] = json!(problems);
        }

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn bad_index_produces_400() {
        let response = AppError(Error::BadIndex { index: 9, len: 2 }).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "bad_index");
    }

    #[tokio::test]
    async fn validation_lists_problems() {
        let err = Error::Validation(vec![ristbond_core::ValidationError::new(
            "rist.buffer_ms",
            "10 is outside 50..=30000",
        )]);
        let response = AppError(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["problems"][0]["field"], "rist.buffer_ms");
    }

    #[test]
    fn launch_failure_is_bad_gateway() {
        let response = AppError(Error::launch("ffmpeg", "denied")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
