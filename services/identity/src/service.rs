use std::sync::Arc;

use crate::{
    error::IdentityError,
    repository::UserRepository,
    session::{Session, SessionStore},
    token::{TokenManager, TokenPair},
    user::{Email, User, Username},
};

/// C7 Identity Service: orchestrates C5 (tokens), C6 (sessions) and C9
/// (user storage). Grounded in
/// `sso-service/internal/application/services/service.go`'s `ssoService`.
pub struct IdentityService {
    repository: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionStore>,
    tokens: Arc<TokenManager>,
    refresh_ttl_seconds: i64,
}

impl IdentityService {
    pub fn new(
        repository: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionStore>,
        tokens: Arc<TokenManager>,
        refresh_ttl_seconds: i64,
    ) -> Self {
        Self {
            repository,
            sessions,
            tokens,
            refresh_ttl_seconds,
        }
    }

    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<TokenPair, IdentityError> {
        let email = Email::parse(email)?;
        let username = Username::parse(username)?;
        let password_hash = crate::user::Password::hash(password)?;

        let user = User::new(email, username, password_hash);
        self.repository.save(&user).await?;

        self.issue_session(&user).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, IdentityError> {
        let normalized = email.trim().to_lowercase();
        let user = self.repository.get_by_email(&normalized).await?;
        if !crate::user::Password::verify(password, &user.password_hash)? {
            return Err(IdentityError::WrongPassword);
        }
        self.issue_session(&user).await
    }

    /// Rotates a refresh token: issues a fresh pair and deletes the old
    /// session as a detached background task, matching `service.go`'s
    /// `go s.clearOldSession(context.Background(), req.GetRefreshToken())`.
    ///
    /// This intentionally leaves the refresh-delete race documented as a
    /// known limitation rather than fixing it: a client that refreshes
    /// twice in quick succession can race the delete of the previous
    /// session against a legitimate concurrent use of it.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, IdentityError> {
        let session = self.sessions.get(refresh_token).await?;
        let pair = self.tokens.generate_pair(&session.user_id, &session.email)?;

        self.sessions
            .create(&pair.refresh, &session, self.refresh_ttl_seconds)
            .await?;

        let sessions = self.sessions.clone();
        let old_token = refresh_token.to_string();
        tokio::spawn(async move {
            if let Err(err) = sessions.delete(&old_token).await {
                tracing::warn!(error = %err, "failed to clear old session");
            }
        });

        Ok(pair)
    }

    pub async fn update_user(&self, user_id: &str, username: &str) -> Result<(), IdentityError> {
        let username = Username::parse(username)?;
        self.repository.update_username(user_id, &username).await
    }

    pub async fn get_user_by_id(&self, user_id: &str) -> Result<User, IdentityError> {
        self.repository.get_by_id(user_id).await
    }

    pub async fn get_self(&self, user_id: &str) -> Result<User, IdentityError> {
        self.repository.get_by_id(user_id).await
    }

    async fn issue_session(&self, user: &User) -> Result<TokenPair, IdentityError> {
        let pair = self
            .tokens
            .generate_pair(&user.id.to_string(), user.email.as_str())?;
        let session = Session {
            user_id: user.id.to_string(),
            email: user.email.as_str().to_string(),
        };
        self.sessions
            .create(&pair.refresh, &session, self.refresh_ttl_seconds)
            .await?;
        Ok(pair)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Mutex};

    use async_trait::async_trait;

    use super::*;

    struct InMemoryUsers(Mutex<HashMap<String, User>>);

    #[async_trait]
    impl UserRepository for InMemoryUsers {
        async fn save(&self, user: &User) -> Result<(), IdentityError> {
            let mut guard = self.0.lock().unwrap();
            if guard.values().any(|u| u.email == user.email) {
                return Err(IdentityError::UserAlreadyRegistered);
            }
            guard.insert(user.id.to_string(), user.clone());
            Ok(())
        }

        async fn get_by_email(&self, email: &str) -> Result<User, IdentityError> {
            self.0
                .lock()
                .unwrap()
                .values()
                .find(|u| u.email.as_str() == email)
                .cloned()
                .ok_or(IdentityError::UserDoesntExist)
        }

        async fn get_by_id(&self, id: &str) -> Result<User, IdentityError> {
            self.0
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or(IdentityError::UserDoesntExist)
        }

        async fn update_username(
            &self,
            id: &str,
            username: &Username,
        ) -> Result<(), IdentityError> {
            let mut guard = self.0.lock().unwrap();
            let user = guard.get_mut(id).ok_or(IdentityError::UserDoesntExist)?;
            user.username = username.clone();
            Ok(())
        }
    }

    struct InMemorySessions(Mutex<HashMap<String, Session>>);

    #[async_trait]
    impl SessionStore for InMemorySessions {
        async fn create(
            &self,
            refresh_token: &str,
            session: &Session,
            _ttl_seconds: i64,
        ) -> Result<(), IdentityError> {
            self.0
                .lock()
                .unwrap()
                .insert(refresh_token.to_string(), session.clone());
            Ok(())
        }

        async fn get(&self, refresh_token: &str) -> Result<Session, IdentityError> {
            self.0
                .lock()
                .unwrap()
                .get(refresh_token)
                .cloned()
                .ok_or(IdentityError::NoSessions)
        }

        async fn delete(&self, refresh_token: &str) -> Result<(), IdentityError> {
            self.0.lock().unwrap().remove(refresh_token);
            Ok(())
        }
    }

    fn token_manager() -> TokenManager {
        let private = include_bytes!("../testdata/test_private.pem");
        let public = include_bytes!("../testdata/test_public.pem");
        TokenManager::new(private, public, 900).unwrap()
    }

    fn service() -> IdentityService {
        IdentityService::new(
            Arc::new(InMemoryUsers(Mutex::new(HashMap::new()))),
            Arc::new(InMemorySessions(Mutex::new(HashMap::new()))),
            Arc::new(token_manager()),
            3600,
        )
    }

    #[tokio::test]
    async fn register_then_login_succeeds() {
        let service = service();
        service
            .register("a@b.com", "bob", "longenoughpassword")
            .await
            .unwrap();
        let pair = service.login("a@b.com", "longenoughpassword").await.unwrap();
        assert!(!pair.access.is_empty());
        assert!(pair.refresh.starts_with("rt_"));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let service = service();
        service
            .register("a@b.com", "bob", "longenoughpassword")
            .await
            .unwrap();
        let err = service
            .register("a@b.com", "carol", "longenoughpassword")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::UserAlreadyRegistered));
    }

    #[tokio::test]
    async fn login_is_case_insensitive_on_email() {
        let service = service();
        service
            .register("Alice@Example.com", "bob", "longenoughpassword")
            .await
            .unwrap();
        let pair = service
            .login("alice@EXAMPLE.com", "longenoughpassword")
            .await
            .unwrap();
        assert!(!pair.access.is_empty());
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_rejected() {
        let service = service();
        service
            .register("a@b.com", "bob", "longenoughpassword")
            .await
            .unwrap();
        let err = service.login("a@b.com", "wrongpassword").await.unwrap_err();
        assert!(matches!(err, IdentityError::WrongPassword));
    }

    #[tokio::test]
    async fn refresh_issues_new_pair_and_invalidates_old_token() {
        let service = service();
        let pair = service
            .register("a@b.com", "bob", "longenoughpassword")
            .await
            .unwrap();
        let rotated = service.refresh(&pair.refresh).await.unwrap();
        assert_ne!(pair.refresh, rotated.refresh);
    }
}
