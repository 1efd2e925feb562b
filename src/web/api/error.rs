use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::ConfigError;
use crate::route::RouteError;
use crate::tracker::TrackerError;

#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    NotFound,
    Conflict(&'static str),
    Internal(String),
}

impl From<RouteError> for ApiError {
    fn from(e: RouteError) -> Self {
        ApiError::Validation(e.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(e: ConfigError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<TrackerError> for ApiError {
    fn from(e: TrackerError) -> Self {
        match e {
            TrackerError::InvalidSample(msg) => ApiError::Validation(msg),
            TrackerError::SessionEnded => ApiError::Conflict("session_ended"),
            TrackerError::LocationPermissionDenied => {
                ApiError::Conflict("location_permission_denied")
            }
            TrackerError::NotReady => ApiError::Internal("no route model loaded".into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::with_message("validation_failed", &msg)),
            )
                .into_response(),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new("session_not_found")),
            )
                .into_response(),
            ApiError::Conflict(reason) => {
                (StatusCode::CONFLICT, Json(ErrorResponse::new(reason))).into_response()
            }
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::with_message("internal_error", &msg)),
            )
                .into_response(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: &str) -> Self {
        ErrorResponse {
            error: error.to_string(),
            message: None,
        }
    }

    pub fn with_message(error: &str, message: &str) -> Self {
        ErrorResponse {
            error: error.to_string(),
            message: Some(message.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_errors_map_to_statuses() {
        let cases = [
            (TrackerError::InvalidSample("nan".into()), StatusCode::BAD_REQUEST),
            (TrackerError::SessionEnded, StatusCode::CONFLICT),
            (TrackerError::LocationPermissionDenied, StatusCode::CONFLICT),
            (TrackerError::NotReady, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn route_errors_are_validation_failures() {
        let response = ApiError::from(RouteError::TooFewWaypoints(1)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
