use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Everything a handler can fail with, already reduced to what the client is
/// allowed to see.
///
/// Messages are fixed per category. The real cause gets logged by whoever
/// builds the error; it never goes over the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    // 400
    EmptyRequest,
    DecodeError,
    Validation(String),

    // 401
    Unauthorized(&'static str),

    // 500
    Internal(&'static str),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::EmptyRequest | ApiError::DecodeError | ApiError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::EmptyRequest => "empty request",
            ApiError::DecodeError => "failed to decode request",
            ApiError::Validation(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Internal(msg) => msg,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(json!({"status": "Error", "error": self.message()})),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_problems_are_bad_requests() {
        assert_eq!(ApiError::EmptyRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::DecodeError.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Validation("field email is a required field".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn messages_are_fixed_per_category() {
        assert_eq!(ApiError::EmptyRequest.message(), "empty request");
        assert_eq!(ApiError::DecodeError.message(), "failed to decode request");
        assert_eq!(
            ApiError::Unauthorized("invalid auth token").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Internal("failed to create item").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
