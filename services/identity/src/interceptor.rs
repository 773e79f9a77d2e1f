use std::sync::Arc;

use tonic::{Request, Status, service::Interceptor};

use crate::token::TokenManager;

pub const USER_ID_METADATA_KEY: &str = "x-coderun-user-id";
pub const EMAIL_METADATA_KEY: &str = "x-coderun-email";
const SESSION_METADATA_KEY: &str = "session";

/// C8 Auth Interceptor: validates the access token carried in the
/// `session` metadata entry and injects the resulting identity back onto
/// the request as metadata the handler can read, matching
/// `sso-service/internal/infrastructure/grpc/interceptors/interceptors.go`'s
/// `UnaryServerInterceptor`, which attaches both `user_id` and `email` to
/// the request context.
///
/// Unlike the Go original, this is wired as a blanket interceptor ahead of
/// every RPC (tonic has no per-method interceptor hook), so it is
/// deliberately permissive: requests with no `session` metadata pass
/// through untouched, and the auth requirement is enforced downstream by
/// handlers that call [`user_id_from_request`] — exactly the set of RPCs
/// the original's `authRequire` map names (`UpdateUser`, `GetSelf`).
/// Requests that *do* present a `session` value must still present a
/// valid one.
#[derive(Clone)]
pub struct AuthInterceptor {
    tokens: Arc<TokenManager>,
}

impl AuthInterceptor {
    pub fn new(tokens: Arc<TokenManager>) -> Self {
        Self { tokens }
    }
}

impl Interceptor for AuthInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let Some(session) = request
            .metadata()
            .get(SESSION_METADATA_KEY)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string)
        else {
            return Ok(request);
        };

        let claims = self
            .tokens
            .validate(&session)
            .map_err(|err| Status::from(&err))?;

        request
            .metadata_mut()
            .insert(USER_ID_METADATA_KEY, claims.user_id.parse().unwrap());
        request
            .metadata_mut()
            .insert(EMAIL_METADATA_KEY, claims.email.parse().unwrap());

        Ok(request)
    }
}

/// Reads the identity the interceptor injected. Returns
/// `MissingSession` if called on a request that bypassed the
/// interceptor (handlers that don't require auth never call this).
pub fn user_id_from_request<T>(request: &Request<T>) -> Result<String, crate::error::IdentityError> {
    request
        .metadata()
        .get(USER_ID_METADATA_KEY)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
        .ok_or(crate::error::IdentityError::MissingSession)
}
