use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shared between the identity service (which signs access tokens) and
/// the executor service (which only ever holds the public key and
/// verifies them), matching the owning specification's C5 Token
/// Manager: "the private key resides only in the identity service; the
/// executor holds the public key for verification."
pub const ISSUER: &str = "shost-sso";

/// Access-claim set, grounded in
/// `sso-service/internal/infrastructure/auth/jwt.go`'s `CoderunClaims`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub iss: String,
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

/// RS256-only verifier. Pinning `Validation` to `Algorithm::RS256` means
/// any token whose `alg` header names a different algorithm (including
/// `none`) is rejected before signature verification ever runs — the
/// algorithm-confusion defense `jwt.go`'s `Validate` performs with an
/// explicit `*jwt.SigningMethodRSA` type assertion.
pub struct AccessTokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AccessTokenVerifier {
    pub fn from_public_key_pem(pem: &[u8]) -> Result<Self, jsonwebtoken::errors::Error> {
        let decoding_key = DecodingKey::from_rsa_pem(pem)?;
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[ISSUER]);
        validation.validate_exp = true;
        Ok(Self {
            decoding_key,
            validation,
        })
    }

    pub fn verify(&self, token: &str) -> Result<AccessClaims, AuthError> {
        decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{Algorithm as EncAlg, EncodingKey, Header, encode};

    fn keypair() -> (Vec<u8>, Vec<u8>) {
        (
            include_bytes!("../testdata/test_private.pem").to_vec(),
            include_bytes!("../testdata/test_public.pem").to_vec(),
        )
    }

    fn token(encoding_key: &EncodingKey, alg: EncAlg, iss: &str, exp: usize) -> String {
        let claims = AccessClaims {
            iss: iss.to_string(),
            sub: "shost-user".to_string(),
            exp,
            iat: 0,
            user_id: "user-1".to_string(),
            email: "a@b.com".to_string(),
        };
        encode(&Header::new(alg), &claims, encoding_key).unwrap()
    }

    #[test]
    fn verifies_a_well_formed_token() {
        let (private, public) = keypair();
        let encoding_key = EncodingKey::from_rsa_pem(&private).unwrap();
        let verifier = AccessTokenVerifier::from_public_key_pem(&public).unwrap();
        let jwt = token(&encoding_key, EncAlg::RS256, ISSUER, 9_999_999_999);
        let claims = verifier.verify(&jwt).unwrap();
        assert_eq!(claims.user_id, "user-1");
    }

    #[test]
    fn rejects_expired_token() {
        let (private, public) = keypair();
        let encoding_key = EncodingKey::from_rsa_pem(&private).unwrap();
        let verifier = AccessTokenVerifier::from_public_key_pem(&public).unwrap();
        let jwt = token(&encoding_key, EncAlg::RS256, ISSUER, 0);
        assert_eq!(verifier.verify(&jwt).unwrap_err(), AuthError::Expired);
    }

    #[test]
    fn rejects_wrong_issuer() {
        let (private, public) = keypair();
        let encoding_key = EncodingKey::from_rsa_pem(&private).unwrap();
        let verifier = AccessTokenVerifier::from_public_key_pem(&public).unwrap();
        let jwt = token(&encoding_key, EncAlg::RS256, "someone-else", 9_999_999_999);
        assert_eq!(verifier.verify(&jwt).unwrap_err(), AuthError::Invalid);
    }
}
