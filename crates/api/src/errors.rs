use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use allowgate_core::{FailureCode, GateError};

/// Map a classified gate failure to the response the identity provider sees.
///
/// Only the code and the public message leave the process.
pub fn gate_error_to_response(err: &GateError) -> axum::response::Response {
    let status = match err.code() {
        FailureCode::InvalidArgument => StatusCode::BAD_REQUEST,
        FailureCode::PermissionDenied => StatusCode::FORBIDDEN,
        FailureCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_error(status, err.code().as_str(), err.public_message())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
