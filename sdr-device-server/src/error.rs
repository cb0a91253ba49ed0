use axum::{
    Json,
    http::StatusCode,
    response::{
        IntoResponse,
        Response,
    },
};
use sdr_types::error::{
    RpcError,
    RpcErrorKind,
};

/// Wraps [`RpcError`] so it can be returned directly from an axum handler:
/// the body is the typed error the device stub expects, the status code is
/// derived from its kind.
pub struct ApiError(pub RpcError);

impl ApiError {
    pub fn not_configured() -> Self {
        Self(RpcError::not_configured())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(RpcError::new(RpcErrorKind::BadRequest, message))
    }
}

impl From<sdr_types::error::ShapeError> for ApiError {
    fn from(value: sdr_types::error::ShapeError) -> Self {
        Self::bad_request(value.to_string())
    }
}

impl From<sdr_types::error::LengthMismatch> for ApiError {
    fn from(value: sdr_types::error::LengthMismatch) -> Self {
        Self::bad_request(value.to_string())
    }
}

impl From<sdr_types::config::RfConfigError> for ApiError {
    fn from(value: sdr_types::config::RfConfigError) -> Self {
        Self::bad_request(value.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        Self::bad_request(value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind {
            RpcErrorKind::NotConfigured => StatusCode::CONFLICT,
            RpcErrorKind::InvalidSampleRateFraction => StatusCode::BAD_REQUEST,
            RpcErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            RpcErrorKind::Driver => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self.0)).into_response()
    }
}
