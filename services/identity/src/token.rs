use chrono::Utc;
use common::auth::{AccessClaims, AccessTokenVerifier, AuthError, ISSUER};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use rand::RngCore;

use crate::error::IdentityError;

pub use common::auth::AccessClaims as Claims;

const SUBJECT: &str = "shost-user";
const REFRESH_PREFIX: &str = "rt_";

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl From<AuthError> for IdentityError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Expired => IdentityError::TokenExpired,
            AuthError::Invalid => IdentityError::InvalidToken,
        }
    }
}

/// RS256 access tokens plus opaque hex refresh tokens. Grounded in
/// `jwt.go`'s `JWTManager`: `GenerateAccess`/`GenerateRefresh`/`GeneratePair`/
/// `Validate`. Signing lives here (the identity service is the only
/// holder of the private key); verification delegates to
/// [`common::auth::AccessTokenVerifier`], the same verifier the executor
/// service uses against the public key alone, so both services agree on
/// exactly one algorithm-confusion defense and claim shape.
pub struct TokenManager {
    encoding_key: EncodingKey,
    verifier: AccessTokenVerifier,
    access_ttl_seconds: i64,
}

impl TokenManager {
    pub fn new(
        private_key_pem: &[u8],
        public_key_pem: &[u8],
        access_ttl_seconds: i64,
    ) -> Result<Self, jsonwebtoken::errors::Error> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem)?;
        let verifier = AccessTokenVerifier::from_public_key_pem(public_key_pem)?;

        Ok(Self {
            encoding_key,
            verifier,
            access_ttl_seconds,
        })
    }

    pub fn generate_access(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            iss: ISSUER.to_string(),
            sub: SUBJECT.to_string(),
            exp: (now + self.access_ttl_seconds) as usize,
            iat: now as usize,
            user_id: user_id.to_string(),
            email: email.to_string(),
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
    }

    pub fn generate_refresh(&self) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        format!("{REFRESH_PREFIX}{}", hex::encode(bytes))
    }

    pub fn generate_pair(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<TokenPair, jsonwebtoken::errors::Error> {
        Ok(TokenPair {
            access: self.generate_access(user_id, email)?,
            refresh: self.generate_refresh(),
        })
    }

    pub fn validate(&self, token: &str) -> Result<Claims, IdentityError> {
        self.verifier.verify(token).map_err(IdentityError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair() -> (Vec<u8>, Vec<u8>) {
        // 2048-bit test keypair, generated once and embedded for
        // deterministic unit tests (no keygen at test time).
        let private = include_bytes!("../testdata/test_private.pem").to_vec();
        let public = include_bytes!("../testdata/test_public.pem").to_vec();
        (private, public)
    }

    #[test]
    fn round_trips_access_token() {
        let (private, public) = keypair();
        let manager = TokenManager::new(&private, &public, 900).unwrap();
        let token = manager.generate_access("user-1", "a@b.com").unwrap();
        let claims = manager.validate(&token).unwrap();
        assert_eq!(claims.user_id, "user-1");
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.iss, ISSUER);
    }

    #[test]
    fn rejects_expired_token() {
        let (private, public) = keypair();
        let manager = TokenManager::new(&private, &public, -1).unwrap();
        let token = manager.generate_access("user-1", "a@b.com").unwrap();
        let err = manager.validate(&token).unwrap_err();
        assert!(matches!(err, IdentityError::TokenExpired));
    }

    #[test]
    fn refresh_tokens_are_prefixed_and_unique() {
        let (private, public) = keypair();
        let manager = TokenManager::new(&private, &public, 900).unwrap();
        let a = manager.generate_refresh();
        let b = manager.generate_refresh();
        assert!(a.starts_with(REFRESH_PREFIX));
        assert_ne!(a, b);
    }
}
