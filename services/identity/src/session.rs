use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::IdentityError;

/// Key prefix for session records in Redis, matching
/// `auth_repository.go`'s `"rtk_" + hex(sha256(refresh))`.
const KEY_PREFIX: &str = "rtk_";

fn session_key(refresh_token: &str) -> String {
    let digest = Sha256::digest(refresh_token.as_bytes());
    format!("{KEY_PREFIX}{}", hex::encode(digest))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: String,
}

/// C6 Session Store: opaque refresh tokens are never stored directly,
/// only their sha256 digest is used as the lookup key, per
/// `sso-service/internal/infrastructure/cache/redis/auth/auth_repository.go`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(
        &self,
        refresh_token: &str,
        session: &Session,
        ttl_seconds: i64,
    ) -> Result<(), IdentityError>;
    async fn get(&self, refresh_token: &str) -> Result<Session, IdentityError>;
    async fn delete(&self, refresh_token: &str) -> Result<(), IdentityError>;
}

pub struct RedisSessionStore {
    manager: redis::aio::ConnectionManager,
}

impl RedisSessionStore {
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager })
    }
}

/// Wire shape of a stored session record, matching
/// `auth_model.go`'s `SessionModel{UserID, Email}`, which `auth_repository.go`
/// round-trips through `json.Marshal`/`json.Unmarshal`.
#[derive(Debug, Serialize, Deserialize)]
struct SessionModel {
    user_id: String,
    email: String,
}

impl From<&Session> for SessionModel {
    fn from(session: &Session) -> Self {
        Self {
            user_id: session.user_id.clone(),
            email: session.email.clone(),
        }
    }
}

impl From<SessionModel> for Session {
    fn from(model: SessionModel) -> Self {
        Self {
            user_id: model.user_id,
            email: model.email,
        }
    }
}

fn encode_session(session: &Session) -> Result<String, IdentityError> {
    serde_json::to_string(&SessionModel::from(session)).map_err(|err| {
        tracing::error!(error = %err, "failed to encode session");
        IdentityError::Internal
    })
}

fn decode_session(raw: &str) -> Option<Session> {
    serde_json::from_str::<SessionModel>(raw).ok().map(Session::from)
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(
        &self,
        refresh_token: &str,
        session: &Session,
        ttl_seconds: i64,
    ) -> Result<(), IdentityError> {
        let mut conn = self.manager.clone();
        let key = session_key(refresh_token);
        let value = encode_session(session)?;
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds.max(1) as u64)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "failed to create session");
                IdentityError::Internal
            })
    }

    async fn get(&self, refresh_token: &str) -> Result<Session, IdentityError> {
        let mut conn = self.manager.clone();
        let key = session_key(refresh_token);
        let raw: Option<String> = conn.get(key).await.map_err(|err| {
            tracing::error!(error = %err, "failed to read session");
            IdentityError::Internal
        })?;
        let raw = raw.ok_or(IdentityError::NoSessions)?;
        decode_session(&raw).ok_or(IdentityError::Internal)
    }

    async fn delete(&self, refresh_token: &str) -> Result<(), IdentityError> {
        let mut conn = self.manager.clone();
        let key = session_key(refresh_token);
        conn.del::<_, ()>(key).await.map_err(|err| {
            tracing::error!(error = %err, "failed to delete session");
            IdentityError::Internal
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_key_is_sha256_hex_of_refresh_token() {
        let key = session_key("rt_abc");
        assert!(key.starts_with(KEY_PREFIX));
        assert_eq!(key.len(), KEY_PREFIX.len() + 64);
    }

    #[test]
    fn session_round_trips_through_encoding() {
        let session = Session {
            user_id: "u-1".to_string(),
            email: "a@b.com".to_string(),
        };
        let encoded = encode_session(&session).unwrap();
        assert_eq!(decode_session(&encoded), Some(session));
    }

    #[test]
    fn session_is_stored_as_json() {
        let session = Session {
            user_id: "u-1".to_string(),
            email: "a@b.com".to_string(),
        };
        let encoded = encode_session(&session).unwrap();
        assert_eq!(encoded, r#"{"user_id":"u-1","email":"a@b.com"}"#);
    }
}
