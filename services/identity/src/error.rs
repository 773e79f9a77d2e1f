use thiserror::Error;
use tonic::Status;

/// Domain error surface for the identity service, mirrored field-for-field
/// on the sentinel errors in `sso-service/pkg/errors/customerrors.go`.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("user already registered")]
    UserAlreadyRegistered,
    #[error("user doesn't exist")]
    UserDoesntExist,
    #[error("invalid username")]
    InvalidUsername,
    #[error("invalid email")]
    InvalidEmail,
    #[error("password must be at least 8 characters")]
    InvalidPassword,
    #[error("wrong password")]
    WrongPassword,
    #[error("no sessions found")]
    NoSessions,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
    #[error("missing session metadata")]
    MissingSession,
    #[error("internal server error")]
    Internal,
}

impl From<&IdentityError> for Status {
    fn from(err: &IdentityError) -> Self {
        use IdentityError::*;
        match err {
            InvalidUsername | InvalidEmail | InvalidPassword => {
                Status::invalid_argument(err.to_string())
            }
            UserAlreadyRegistered => Status::already_exists(err.to_string()),
            UserDoesntExist => Status::not_found(err.to_string()),
            WrongPassword | InvalidToken | TokenExpired | NoSessions | MissingSession => {
                Status::unauthenticated(err.to_string())
            }
            Internal => Status::internal(err.to_string()),
        }
    }
}

impl From<IdentityError> for Status {
    fn from(err: IdentityError) -> Self {
        Status::from(&err)
    }
}
