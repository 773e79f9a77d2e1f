use async_trait::async_trait;
use mongodb::{
    Collection, Database,
    bson::{doc, to_bson},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::IdentityError,
    user::{Email, User, Username},
};

/// BSON-serializable projection of [`User`]. Mirrors the document shape
/// written by `sso-service/internal/infrastructure/persistence/mongo/user/user_repository.go`,
/// which stores the uuid under a plain `id` string field rather than the
/// native Mongo `_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserDocument {
    id: String,
    email: String,
    username: String,
    password_hash: String,
}

impl From<&User> for UserDocument {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.as_str().to_string(),
            username: user.username.as_str().to_string(),
            password_hash: user.password_hash.clone(),
        }
    }
}

impl TryFrom<UserDocument> for User {
    type Error = IdentityError;

    fn try_from(doc: UserDocument) -> Result<Self, Self::Error> {
        Ok(User {
            id: Uuid::parse_str(&doc.id).map_err(|_| IdentityError::Internal)?,
            email: Email::parse(&doc.email)?,
            username: Username::parse(&doc.username)?,
            password_hash: doc.password_hash,
        })
    }
}

/// C9 User Repository: unique-email invariant enforced by a unique index
/// on `email` (created at startup, see `EnsureIndexes`), matching
/// `user_repository.go`'s `Save`/`GetByEmail`/`GetByID`/`Update`.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn save(&self, user: &User) -> Result<(), IdentityError>;
    async fn get_by_email(&self, email: &str) -> Result<User, IdentityError>;
    async fn get_by_id(&self, id: &str) -> Result<User, IdentityError>;
    async fn update_username(&self, id: &str, username: &Username) -> Result<(), IdentityError>;
}

pub struct MongoUserRepository {
    collection: Collection<UserDocument>,
}

impl MongoUserRepository {
    pub fn new(database: &Database) -> Self {
        Self {
            collection: database.collection("users"),
        }
    }

    /// Creates the unique index on `email` that backs the service's
    /// unique-email invariant (S-series scenario in the owning spec).
    /// Called once at startup.
    pub async fn ensure_indexes(&self) -> Result<(), mongodb::error::Error> {
        use mongodb::IndexModel;
        let model = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                mongodb::options::IndexOptions::builder()
                    .unique(true)
                    .build(),
            )
            .build();
        self.collection.create_index(model).await?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn save(&self, user: &User) -> Result<(), IdentityError> {
        let document = UserDocument::from(user);
        self.collection.insert_one(document).await.map_err(|err| {
            if is_duplicate_key_error(&err) {
                IdentityError::UserAlreadyRegistered
            } else {
                tracing::error!(error = %err, "failed to save user");
                IdentityError::Internal
            }
        })?;
        Ok(())
    }

    async fn get_by_email(&self, email: &str) -> Result<User, IdentityError> {
        let document = self
            .collection
            .find_one(doc! { "email": email })
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "failed to query user by email");
                IdentityError::Internal
            })?
            .ok_or(IdentityError::UserDoesntExist)?;
        document.try_into()
    }

    async fn get_by_id(&self, id: &str) -> Result<User, IdentityError> {
        let document = self
            .collection
            .find_one(doc! { "id": id })
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "failed to query user by id");
                IdentityError::Internal
            })?
            .ok_or(IdentityError::UserDoesntExist)?;
        document.try_into()
    }

    async fn update_username(&self, id: &str, username: &Username) -> Result<(), IdentityError> {
        let update = doc! { "$set": { "username": to_bson(username.as_str()).unwrap() } };
        let result = self
            .collection
            .update_one(doc! { "id": id }, update)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "failed to update username");
                IdentityError::Internal
            })?;
        if result.matched_count == 0 {
            return Err(IdentityError::UserDoesntExist);
        }
        Ok(())
    }
}

fn is_duplicate_key_error(err: &mongodb::error::Error) -> bool {
    use mongodb::error::ErrorKind;
    matches!(err.kind.as_ref(), ErrorKind::Write(_)) && err.to_string().contains("E11000")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_document_round_trips_into_domain_user() {
        let user = User::new(
            Email::parse("a@b.com").unwrap(),
            Username::parse("bob").unwrap(),
            "hash".to_string(),
        );
        let document = UserDocument::from(&user);
        let restored: User = document.try_into().unwrap();
        assert_eq!(restored, user);
    }
}
