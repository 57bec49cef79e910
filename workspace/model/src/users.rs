//! User lifecycle and bearer token issuance.
//!
//! [`UserManager`] is constructed once per process around a database
//! connection and handed to whatever needs to create or authenticate users.

use crate::entities::{auth_token, user};
use crate::password;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set, SqlErr, TransactionTrait,
};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Errors raised while managing users and their tokens.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User must have an email address")]
    EmptyEmail,
    #[error("A user with email '{0}' already exists")]
    EmailTaken(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Failed to hash password: {0}")]
    PasswordHash(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Normalize an email address by trimming it and lowercasing the domain part.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Manager for user accounts and their authentication tokens.
#[derive(Clone, Debug)]
pub struct UserManager {
    db: DatabaseConnection,
}

impl UserManager {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a new user with a hashed password.
    ///
    /// Without a password the user is stored with an unusable one and cannot
    /// sign in until a password is set.
    #[instrument(skip(self, password))]
    pub async fn create_user(
        &self,
        email: &str,
        password: Option<&str>,
    ) -> Result<user::Model, UserError> {
        let email = normalize_email(email);
        if email.is_empty() {
            warn!("Refusing to create a user without an email address");
            return Err(UserError::EmptyEmail);
        }

        if self.find_by_email(&email).await?.is_some() {
            warn!("User with email {} already exists", email);
            return Err(UserError::EmailTaken(email));
        }

        let password = match password {
            Some(raw) => password::hash_password(raw)
                .map_err(|e| UserError::PasswordHash(e.to_string()))?,
            None => password::make_unusable_password(),
        };

        let new_user = user::ActiveModel {
            email: Set(email.clone()),
            password: Set(password),
            is_active: Set(true),
            is_staff: Set(false),
            is_superuser: Set(false),
            last_login: Set(None),
            ..Default::default()
        };

        match new_user.insert(&self.db).await {
            Ok(user) => {
                info!("Created user {} with ID {}", user.email, user.id);
                Ok(user)
            }
            // Lost a race against a concurrent sign-up for the same address
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                warn!("User with email {} already exists", email);
                Err(UserError::EmailTaken(email))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Create and save a new superuser with given details
    #[instrument(skip(self, password))]
    pub async fn create_superuser(
        &self,
        email: &str,
        password: &str,
    ) -> Result<user::Model, UserError> {
        let user = self.create_user(email, Some(password)).await?;

        let mut active: user::ActiveModel = user.into();
        active.is_staff = Set(true);
        active.is_superuser = Set(true);
        let user = active.update(&self.db).await?;

        info!("Promoted user {} to superuser", user.email);
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, UserError> {
        let email = normalize_email(email);
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?)
    }

    /// Check credentials and return the matching active user.
    ///
    /// Unknown emails, wrong passwords and inactive users all produce
    /// [`UserError::InvalidCredentials`].
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<user::Model, UserError> {
        let Some(user) = self.find_by_email(email).await? else {
            debug!("No user registered under {}", email);
            return Err(UserError::InvalidCredentials);
        };

        if !user.is_active || !password::verify_password(password, &user.password) {
            debug!("Rejected credentials for user {}", user.id);
            return Err(UserError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Replace any existing token of `user` with a freshly generated one.
    ///
    /// The delete and insert run in one transaction so the user never ends up
    /// with zero or two tokens.
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn issue_token(&self, user: &user::Model) -> Result<String, UserError> {
        let txn = self.db.begin().await?;

        let removed = auth_token::Entity::delete_many()
            .filter(auth_token::Column::UserId.eq(user.id))
            .exec(&txn)
            .await?;
        debug!("Removed {} previous token(s)", removed.rows_affected);

        let token = auth_token::ActiveModel {
            key: Set(password::generate_token_key()),
            user_id: Set(user.id),
            created: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!("Issued new token for user {}", user.id);
        Ok(token.key)
    }

    /// Delete the token of `user`, if any.
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn revoke_token(&self, user: &user::Model) -> Result<(), UserError> {
        let removed = auth_token::Entity::delete_many()
            .filter(auth_token::Column::UserId.eq(user.id))
            .exec(&self.db)
            .await?;

        info!("Revoked {} token(s) for user {}", removed.rows_affected, user.id);
        Ok(())
    }

    /// The current token key of `user`, if one has been issued.
    pub async fn token_for(&self, user: &user::Model) -> Result<Option<String>, UserError> {
        Ok(auth_token::Entity::find()
            .filter(auth_token::Column::UserId.eq(user.id))
            .one(&self.db)
            .await?
            .map(|token| token.key))
    }

    /// Number of tokens held by `user`. Never more than one.
    pub async fn token_count(&self, user: &user::Model) -> Result<u64, UserError> {
        Ok(auth_token::Entity::find()
            .filter(auth_token::Column::UserId.eq(user.id))
            .count(&self.db)
            .await?)
    }

    /// Resolve a presented token key to its active owner.
    pub async fn user_for_token(&self, key: &str) -> Result<Option<user::Model>, UserError> {
        let found = auth_token::Entity::find_by_id(key.to_string())
            .find_also_related(user::Entity)
            .one(&self.db)
            .await?;

        Ok(match found {
            Some((_, Some(user))) if user.is_active => Some(user),
            _ => None,
        })
    }

    #[instrument(skip(self, user, new_password), fields(user_id = user.id))]
    pub async fn set_password(
        &self,
        user: user::Model,
        new_password: &str,
    ) -> Result<user::Model, UserError> {
        let hash = password::hash_password(new_password)
            .map_err(|e| UserError::PasswordHash(e.to_string()))?;

        let mut active: user::ActiveModel = user.into();
        active.password = Set(hash);
        let user = active.update(&self.db).await?;

        info!("Password changed for user {}", user.id);
        Ok(user)
    }

    pub async fn record_login(&self, user: user::Model) -> Result<user::Model, UserError> {
        let mut active: user::ActiveModel = user.into();
        active.last_login = Set(Some(Utc::now()));
        Ok(active.update(&self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectionTrait, Database, EntityName, Schema};

    async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();

        let backend = db.get_database_backend();
        let schema = Schema::new(backend);
        db.execute(backend.build(&schema.create_table_from_entity(user::Entity)))
            .await
            .unwrap();
        db.execute(backend.build(&schema.create_table_from_entity(auth_token::Entity)))
            .await
            .unwrap();

        db
    }

    async fn setup_manager() -> UserManager {
        UserManager::new(setup_test_db().await)
    }

    #[test]
    fn test_normalize_email_lowercases_domain_only() {
        assert_eq!(normalize_email("  Mango.Fan@EXAMPLE.Com "), "Mango.Fan@example.com");
        assert_eq!(normalize_email("no-at-sign"), "no-at-sign");
        assert_eq!(normalize_email("   "), "");
    }

    #[tokio::test]
    async fn test_create_user_requires_email() {
        let users = setup_manager().await;

        let result = users.create_user("", Some("secret")).await;
        assert!(matches!(result, Err(UserError::EmptyEmail)));

        let result = users.create_user("   ", Some("secret")).await;
        assert!(matches!(result, Err(UserError::EmptyEmail)));

        let count = user::Entity::find().count(&users.db).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_create_user_hashes_password() {
        let users = setup_manager().await;

        let user = users
            .create_user("grower@Orchard.example", Some("plain-secret"))
            .await
            .unwrap();

        assert_eq!(user.email, "grower@orchard.example");
        assert_ne!(user.password, "plain-secret");
        assert!(!user.password.contains("plain-secret"));
        assert!(password::verify_password("plain-secret", &user.password));
        assert!(user.is_active);
        assert!(!user.is_staff);
        assert!(!user.is_superuser);
        assert_eq!(user.to_string(), "grower@orchard.example");
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicate_email() {
        let users = setup_manager().await;

        users.create_user("dup@example.com", Some("a")).await.unwrap();
        let result = users.create_user("dup@EXAMPLE.com", Some("b")).await;

        match result {
            Err(UserError::EmailTaken(email)) => assert_eq!(email, "dup@example.com"),
            other => panic!("Expected EmailTaken, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_user_without_password_cannot_sign_in() {
        let users = setup_manager().await;

        let user = users.create_user("nopass@example.com", None).await.unwrap();
        assert!(!user.has_usable_password());

        let result = users.authenticate("nopass@example.com", "").await;
        assert!(matches!(result, Err(UserError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_create_superuser_sets_flags() {
        let users = setup_manager().await;

        let admin = users
            .create_superuser("admin@example.com", "root-pass")
            .await
            .unwrap();

        assert!(admin.is_staff);
        assert!(admin.is_superuser);
        assert!(admin.is_active);
    }

    #[tokio::test]
    async fn test_authenticate() {
        let users = setup_manager().await;
        let created = users.create_user("auth@example.com", Some("right")).await.unwrap();

        let found = users.authenticate("auth@example.com", "right").await.unwrap();
        assert_eq!(found.id, created.id);

        let wrong = users.authenticate("auth@example.com", "wrong").await;
        assert!(matches!(wrong, Err(UserError::InvalidCredentials)));

        let unknown = users.authenticate("ghost@example.com", "right").await;
        assert!(matches!(unknown, Err(UserError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_inactive_user() {
        let users = setup_manager().await;
        let created = users.create_user("idle@example.com", Some("pw")).await.unwrap();

        let mut active: user::ActiveModel = created.into();
        active.is_active = Set(false);
        active.update(&users.db).await.unwrap();

        let result = users.authenticate("idle@example.com", "pw").await;
        assert!(matches!(result, Err(UserError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_issue_token_replaces_previous_token() {
        let users = setup_manager().await;
        let user = users.create_user("token@example.com", Some("pw")).await.unwrap();

        let first = users.issue_token(&user).await.unwrap();
        let second = users.issue_token(&user).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(users.token_count(&user).await.unwrap(), 1);
        assert_eq!(users.token_for(&user).await.unwrap(), Some(second.clone()));

        assert!(users.user_for_token(&first).await.unwrap().is_none());
        let owner = users.user_for_token(&second).await.unwrap().unwrap();
        assert_eq!(owner.id, user.id);
    }

    #[tokio::test]
    async fn test_tokens_are_per_user() {
        let users = setup_manager().await;
        let alice = users.create_user("alice@example.com", Some("pw")).await.unwrap();
        let bob = users.create_user("bob@example.com", Some("pw")).await.unwrap();

        let alice_token = users.issue_token(&alice).await.unwrap();
        users.issue_token(&bob).await.unwrap();

        assert_eq!(users.token_count(&alice).await.unwrap(), 1);
        assert_eq!(users.token_count(&bob).await.unwrap(), 1);
        assert_eq!(users.token_for(&alice).await.unwrap(), Some(alice_token));
    }

    #[tokio::test]
    async fn test_revoke_token() {
        let users = setup_manager().await;
        let user = users.create_user("revoke@example.com", Some("pw")).await.unwrap();

        let key = users.issue_token(&user).await.unwrap();
        users.revoke_token(&user).await.unwrap();

        assert_eq!(users.token_count(&user).await.unwrap(), 0);
        assert!(users.user_for_token(&key).await.unwrap().is_none());

        // Revoking again is a no-op
        users.revoke_token(&user).await.unwrap();
    }

    #[tokio::test]
    async fn test_token_of_inactive_user_is_rejected() {
        let users = setup_manager().await;
        let user = users.create_user("sleepy@example.com", Some("pw")).await.unwrap();
        let key = users.issue_token(&user).await.unwrap();

        let mut active: user::ActiveModel = user.into();
        active.is_active = Set(false);
        active.update(&users.db).await.unwrap();

        assert!(users.user_for_token(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_password() {
        let users = setup_manager().await;
        let user = users.create_user("change@example.com", Some("old")).await.unwrap();

        users.set_password(user, "new").await.unwrap();

        assert!(users.authenticate("change@example.com", "new").await.is_ok());
        assert!(users.authenticate("change@example.com", "old").await.is_err());
    }

    #[tokio::test]
    async fn test_record_login() {
        let users = setup_manager().await;
        let user = users.create_user("login@example.com", Some("pw")).await.unwrap();
        assert!(user.last_login.is_none());

        let user = users.record_login(user).await.unwrap();
        assert!(user.last_login.is_some());
    }

    #[test]
    fn test_table_names() {
        assert_eq!(user::Entity.table_name(), "users");
        assert_eq!(auth_token::Entity.table_name(), "auth_tokens");
    }
}
