use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tonic::Code;

/// Gateway-facing error type. `IntoResponse` mirrors
/// `apps/runtime/src/server.rs`'s `ApiError`; the gRPC-status-to-HTTP
/// mapping mirrors `rest-gateway/internal/application/services/service.go`,
/// which inspects `status.FromError` per RPC and maps each `codes.X` to a
/// specific HTTP status rather than collapsing everything to 502.
#[derive(Debug)]
pub enum ApiError {
    InvalidRequest(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    GatewayTimeout(String),
    BadGateway(String),
    Internal(String),
}

impl ApiError {
    /// Maps an outbound gRPC failure the way every
    /// `restGatewayService` method in the original does: decode the
    /// `tonic::Status`, and translate specific codes into specific HTTP
    /// statuses, falling back to 502 for anything unexpected.
    pub fn from_status(status: tonic::Status) -> Self {
        let message = status.message().to_string();
        match status.code() {
            Code::InvalidArgument => ApiError::InvalidRequest(message),
            Code::AlreadyExists => ApiError::Conflict(message),
            Code::Unauthenticated => ApiError::Unauthorized(message),
            Code::NotFound => ApiError::NotFound(message),
            Code::DeadlineExceeded | Code::Cancelled => ApiError::GatewayTimeout(message),
            _ => {
                tracing::error!(error = %message, code = ?status.code(), "upstream rpc failed");
                ApiError::BadGateway("internal server error".to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::GatewayTimeout(message) => (StatusCode::GATEWAY_TIMEOUT, message),
            ApiError::BadGateway(message) => (StatusCode::BAD_GATEWAY, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
