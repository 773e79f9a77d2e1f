use std::sync::Arc;

use common::auth::AccessTokenVerifier;
use tonic::{Request, Status, service::Interceptor};

use crate::error::ExecutorError;

pub const USER_ID_METADATA_KEY: &str = "x-coderun-user-id";
const SESSION_METADATA_KEY: &str = "session";

/// C8 Auth Interceptor, applied to the executor's single RPC. Unlike the
/// identity service (where only two of six methods require auth),
/// `Execute` is the only method this server exposes and it always
/// requires a valid session — matching spec.md's S7 scenario
/// ("Execute without session metadata -> Unauthenticated, no container
/// created"). The executor only ever holds the public key, never the
/// private one; verification is the same [`AccessTokenVerifier`] the
/// identity service's [`crate`]-independent `common::auth` module
/// backs for both services.
#[derive(Clone)]
pub struct ExecutorAuthInterceptor {
    verifier: Arc<AccessTokenVerifier>,
}

impl ExecutorAuthInterceptor {
    pub fn new(verifier: Arc<AccessTokenVerifier>) -> Self {
        Self { verifier }
    }
}

impl Interceptor for ExecutorAuthInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let session = request
            .metadata()
            .get(SESSION_METADATA_KEY)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string)
            .ok_or_else(|| Status::from(&ExecutorError::MissingSession))?;

        let claims = self
            .verifier
            .verify(&session)
            .map_err(|err| Status::from(&ExecutorError::from(err)))?;

        request
            .metadata_mut()
            .insert(USER_ID_METADATA_KEY, claims.user_id.parse().map_err(|_| {
                Status::from(&ExecutorError::InvalidToken)
            })?);

        Ok(request)
    }
}

/// Reads the user id the interceptor injected, for the fire-and-forget
/// analytics write (`ExecutorService`'s telemetry side-effect).
pub fn user_id_from_request<T>(request: &Request<T>) -> Option<String> {
    request
        .metadata()
        .get(USER_ID_METADATA_KEY)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use common::auth::ISSUER;
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
    use serde::Serialize;
    use tonic::metadata::MetadataValue;

    use super::*;

    #[derive(Serialize)]
    struct TestClaims {
        iss: String,
        sub: String,
        exp: usize,
        iat: usize,
        user_id: String,
        email: String,
    }

    fn sign(user_id: &str) -> String {
        let private = include_bytes!("../testdata/test_private.pem");
        let encoding_key = EncodingKey::from_rsa_pem(private).unwrap();
        let claims = TestClaims {
            iss: ISSUER.to_string(),
            sub: "shost-user".to_string(),
            exp: 9_999_999_999,
            iat: 0,
            user_id: user_id.to_string(),
            email: "a@b.com".to_string(),
        };
        encode(&Header::new(Algorithm::RS256), &claims, &encoding_key).unwrap()
    }

    fn interceptor() -> ExecutorAuthInterceptor {
        let public = include_bytes!("../testdata/test_public.pem");
        ExecutorAuthInterceptor::new(Arc::new(
            AccessTokenVerifier::from_public_key_pem(public).unwrap(),
        ))
    }

    #[test]
    fn rejects_missing_session_metadata() {
        let mut interceptor = interceptor();
        let err = interceptor.call(Request::new(())).unwrap_err();
        assert_eq!(err.code(), tonic::Code::Unauthenticated);
    }

    #[test]
    fn rejects_malformed_token() {
        let mut interceptor = interceptor();
        let mut request = Request::new(());
        request
            .metadata_mut()
            .insert("session", MetadataValue::from_static("not-a-jwt"));
        let err = interceptor.call(request).unwrap_err();
        assert_eq!(err.code(), tonic::Code::Unauthenticated);
    }

    #[test]
    fn injects_user_id_from_a_valid_token() {
        let mut interceptor = interceptor();
        let token = sign("user-42");
        let mut request = Request::new(());
        request
            .metadata_mut()
            .insert("session", token.parse().unwrap());
        let request = interceptor.call(request).unwrap();
        assert_eq!(
            user_id_from_request(&request),
            Some("user-42".to_string())
        );
    }
}
