use uuid::Uuid;

use crate::error::IdentityError;

const MIN_PASSWORD_LEN: usize = 8;
const BCRYPT_COST: u32 = 10;

/// Validated, lowercased email value object, grounded in `sso-service`'s
/// `vo.go` for the single-`@`/non-empty-parts check (the original's
/// pragmatic `net/mail.ParseAddress`-backed check rather than a full RFC
/// 5322 grammar) and in this spec's User invariant that `email` is
/// stored lowercased, so lookups are case-insensitive against a
/// case-insensitive unique index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let trimmed = raw.trim();
        let mut parts = trimmed.split('@');
        let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
            (Some(local), Some(domain), None) => (local, domain),
            _ => return Err(IdentityError::InvalidEmail),
        };
        if local.is_empty() || domain.is_empty() || !domain.contains('.') {
            return Err(IdentityError::InvalidEmail);
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validated, trimmed, non-empty username, grounded in `user.go`'s
/// `New`/`From` constructors (`ErrInvalidUsername` on empty-after-trim).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdentityError::InvalidUsername);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Password value object: `New` enforces a minimum length before
/// hashing, `Check` compares a candidate against the stored bcrypt hash.
/// Grounded in `vo.go`'s `NewPassword`/`Check`, using `bcrypt.DefaultCost`
/// (cost 10) as the original does.
pub struct Password;

impl Password {
    pub fn hash(raw: &str) -> Result<String, IdentityError> {
        let trimmed = raw.trim();
        if trimmed.len() < MIN_PASSWORD_LEN {
            return Err(IdentityError::InvalidPassword);
        }
        bcrypt::hash(trimmed, BCRYPT_COST).map_err(|err| {
            tracing::error!(error = %err, "failed to hash password");
            IdentityError::Internal
        })
    }

    pub fn verify(raw: &str, hashed: &str) -> Result<bool, IdentityError> {
        bcrypt::verify(raw, hashed).map_err(|err| {
            tracing::error!(error = %err, "failed to verify password");
            IdentityError::Internal
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: Email,
    pub username: Username,
    pub password_hash: String,
}

impl User {
    pub fn new(email: Email, username: Username, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            username,
            password_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_requires_single_at_and_dotted_domain() {
        assert!(Email::parse("a@b.com").is_ok());
        assert!(Email::parse("no-at-sign").is_err());
        assert!(Email::parse("a@b@c.com").is_err());
        assert!(Email::parse("a@localhost").is_err());
    }

    #[test]
    fn email_is_lowercased() {
        assert_eq!(Email::parse("Alice@Example.COM").unwrap().as_str(), "alice@example.com");
    }

    #[test]
    fn username_trims_and_rejects_blank() {
        assert_eq!(Username::parse("  bob  ").unwrap().as_str(), "bob");
        assert!(Username::parse("   ").is_err());
    }

    #[test]
    fn password_rejects_short_values() {
        assert!(matches!(
            Password::hash("short"),
            Err(IdentityError::InvalidPassword)
        ));
    }

    #[test]
    fn password_hash_round_trips() {
        let hash = Password::hash("longenoughpassword").unwrap();
        assert!(Password::verify("longenoughpassword", &hash).unwrap());
        assert!(!Password::verify("wrongpassword", &hash).unwrap());
    }
}
