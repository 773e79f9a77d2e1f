use thiserror::Error;
use tonic::Status;

/// Domain error surface for the executor service, mirrored on the
/// sentinel errors in `xcutr-service/pkg/errors/customerrors.go`.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("no main file specified")]
    NoMain,
    #[error("unsupported language")]
    InvalidLanguage,
    #[error("requested timeout is too large")]
    TooLargeTimeout,
    #[error("no files provided")]
    NoFiles,
    #[error("invalid filename")]
    InvalidFilename,
    #[error("file is empty")]
    EmptyFile,
    #[error("file is too large")]
    TooLargeFile,
    #[error("image not found")]
    NotFoundImage,
    #[error("container runtime unavailable")]
    RuntimeUnavailable,
    #[error("missing session metadata")]
    MissingSession,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
    #[error("internal server error")]
    Internal,
}

impl From<common::auth::AuthError> for ExecutorError {
    fn from(err: common::auth::AuthError) -> Self {
        match err {
            common::auth::AuthError::Expired => ExecutorError::TokenExpired,
            common::auth::AuthError::Invalid => ExecutorError::InvalidToken,
        }
    }
}

/// Status mapping grounded in
/// `xcutr-service/internal/infrastructure/grpc/handlers/handler.go`:
/// request-shape errors map to `InvalidArgument`, everything else to
/// `Internal`.
impl From<&ExecutorError> for Status {
    fn from(err: &ExecutorError) -> Self {
        use ExecutorError::*;
        match err {
            NoMain | TooLargeTimeout | NoFiles | InvalidFilename | EmptyFile | TooLargeFile
            | InvalidLanguage => Status::invalid_argument(err.to_string()),
            MissingSession | InvalidToken | TokenExpired => {
                Status::unauthenticated(err.to_string())
            }
            NotFoundImage | RuntimeUnavailable | Internal => Status::internal(err.to_string()),
        }
    }
}

impl From<ExecutorError> for Status {
    fn from(err: ExecutorError) -> Self {
        Status::from(&err)
    }
}
