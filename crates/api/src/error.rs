use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use skipro_core::session::SessionError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Session(#[from] SessionError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    /// Body could not be read or decoded, including bodies over the size limit.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    /// External call failed with no safe default; the client may retry.
    #[error("upstream unavailable: {0:#}")]
    Upstream(anyhow::Error),
}

/// `Json` whose rejections use the JSON error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    retryable: bool,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Session(SessionError::InvalidTransition { .. }) => {
                (StatusCode::CONFLICT, "INVALID_TRANSITION")
            }
            ApiError::Session(SessionError::Analysis(_)) => (StatusCode::BAD_GATEWAY, "ANALYSIS_FAILED"),
            ApiError::Session(e) if e.is_input_validation() => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            ApiError::Session(_) => (StatusCode::BAD_REQUEST, "SESSION_ERROR"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Rejected { status, .. } if *status == StatusCode::PAYLOAD_TOO_LARGE => {
                (*status, "PAYLOAD_TOO_LARGE")
            }
            ApiError::Rejected { status, .. } => (*status, "INVALID_BODY"),
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_UNAVAILABLE"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if let ApiError::Upstream(err) = &self {
            sentry_anyhow::capture_anyhow(err);
            tracing::warn!(error = %format!("{err:#}"), "upstream call failed");
        }
        let body = ErrorBody {
            code,
            message: self.to_string(),
            retryable: status == StatusCode::BAD_GATEWAY,
        };
        (status, Json(body)).into_response()
    }
}
