use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use services::{AttendanceError, ErrorKind};

/// Standardized API response wrapper for all outgoing JSON responses.
///
/// This struct enforces a consistent response structure across all endpoints:
/// ```json
/// {
///   "success": true,
///   "data": { ... },
///   "message": "Some message"
/// }
/// ```
///
/// Failed attendance operations additionally carry a stable `code`
/// (`INVALID_CODE`, `ALREADY_CHECKED_IN`, ...) that clients branch on:
/// ```json
/// {
///   "success": false,
///   "data": {},
///   "message": "Attendance has already been recorded",
///   "code": "ALREADY_CHECKED_IN"
/// }
/// ```
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub data: T,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Placeholder payload for responses that carry no data.
#[derive(Debug, Default, Serialize)]
pub struct Empty {}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    /// Constructs a success response with the given data and message.
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
            code: None,
        }
    }

    /// Constructs an error response with a message and default `data`.
    ///
    /// # Requires
    /// - `T` must implement `Default`, since error responses do not include useful data.
    pub fn error(message: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            success: false,
            data: T::default(),
            message: message.into(),
            code: None,
        }
    }

    /// Like [`ApiResponse::error`], tagged with a machine-readable code.
    pub fn error_with_code(message: impl Into<String>, code: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            code: Some(code.into()),
            ..Self::error(message)
        }
    }
}

pub type ErrorResponse = (StatusCode, Json<ApiResponse<Empty>>);

/// HTTP status for each failure category.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Turns a service error into the envelope clients see.
///
/// Storage failures are logged here and reported without their details.
pub fn error_body(err: &AttendanceError) -> ErrorResponse {
    let kind = err.kind();
    let message = match kind {
        ErrorKind::Internal => {
            tracing::error!(error = %err, "request failed");
            "Internal server error".to_string()
        }
        _ => err.to_string(),
    };
    (
        status_for(kind),
        Json(ApiResponse::error_with_code(message, err.code())),
    )
}

pub fn error_response(err: &AttendanceError) -> Response {
    error_body(err).into_response()
}

/// `200 OK` wrapping `data`.
pub fn ok<T: Serialize>(data: T, message: &str) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data, message))).into_response()
}
