use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::SubsecRound;
use sea_orm::*;
use std::sync::Arc;
use taskly_core::validation::{
    LoginFields, RegistrationFields, validate_login, validate_registration,
};
use taskly_core::{Task, User, UserId, ValidationErrors};

use crate::config::Config;
use crate::entities::{access_token, task, user};

pub mod api;

/// The authenticated requester, resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    /// `jti` of the token the request was made with.
    pub token_id: String,
}

impl CurrentUser {
    pub fn new(id: UserId, token_id: String) -> Self {
        Self { id, token_id }
    }
}

/// Authentication state: the database holding issued tokens and the signing secret.
#[derive(Clone)]
pub struct AuthState {
    pub db: Arc<DatabaseConnection>,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}

impl AuthState {
    /// Creates a new AuthState from the application config.
    pub fn from_config(config: &Config, db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            jwt_secret: config.jwt_secret.clone(),
            token_ttl: config.token_ttl(),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct Claims {
    pub exp: usize,      // Expiry time of the token
    pub iat: usize,      // Issued at time of the token
    pub user_id: UserId, // Owner of the token
    pub jti: String,     // Key of the access_tokens row backing this token
}

/// Error type for AuthService operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    /// The request payload failed field validation.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),
    /// Email and password do not match a registered user.
    #[error("The provided credentials are incorrect.")]
    InvalidCredentials,
    /// The token is missing, malformed, expired or revoked.
    #[error("Unauthenticated.")]
    Unauthenticated,
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// Hashing or token signing failed.
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Hash a password using argon2id.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Invalid password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn encode_jwt(
    user_id: UserId,
    jti: String,
    jwt_secret: &str,
    ttl: chrono::Duration,
) -> anyhow::Result<String> {
    let now = chrono::Utc::now();
    let exp = (now + ttl).timestamp() as usize;
    let iat = now.timestamp() as usize;
    let claims = Claims {
        exp,
        iat,
        user_id,
        jti,
    };
    let jwt = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(jwt_secret.as_bytes()),
    )?;
    Ok(jwt)
}

pub fn decode_jwt(token: &str, jwt_secret: &str) -> anyhow::Result<Claims> {
    let token_data = jsonwebtoken::decode(
        token,
        &jsonwebtoken::DecodingKey::from_secret(jwt_secret.as_bytes()),
        &jsonwebtoken::Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Current time at the precision timestamps are stored with.
pub(crate) fn now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now().trunc_subsecs(0)
}

pub struct AuthService<'a> {
    db: &'a DatabaseConnection,
    jwt_secret: &'a str,
    token_ttl: chrono::Duration,
}

impl<'a> AuthService<'a> {
    pub fn new(
        db: &'a DatabaseConnection,
        jwt_secret: &'a str,
        token_ttl: chrono::Duration,
    ) -> AuthService<'a> {
        AuthService {
            db,
            jwt_secret,
            token_ttl,
        }
    }

    pub fn from_state(state: &'a AuthState) -> AuthService<'a> {
        AuthService::new(&state.db, &state.jwt_secret, state.token_ttl)
    }

    /// Registers a new user and signs them in.
    ///
    /// # Returns
    ///
    /// The created user and a fresh bearer token.
    #[tracing::instrument(skip(self, fields), fields(email = ?fields.email))]
    pub async fn register(
        &self,
        fields: &RegistrationFields,
    ) -> Result<(User, String), AuthServiceError> {
        let registration = validate_registration(fields).map_err(AuthServiceError::Validation)?;

        if self.find_by_email(&registration.email).await?.is_some() {
            return Err(email_taken());
        }

        let password_hash = hash_password(&registration.password)?;
        let timestamp = now();
        let active_model = user::ActiveModel {
            name: ActiveValue::Set(registration.name),
            email: ActiveValue::Set(registration.email),
            password_hash: ActiveValue::Set(password_hash),
            created_at: ActiveValue::Set(timestamp),
            updated_at: ActiveValue::Set(timestamp),
            ..Default::default()
        };
        let created = match active_model.insert(self.db).await {
            Ok(created) => created,
            // Lost a race against a concurrent registration with the same email.
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(email_taken());
            }
            Err(err) => return Err(err.into()),
        };

        let token = self.issue_token(created.id).await?;
        tracing::info!(user_id = created.id, "Registered user");
        Ok((created.into(), token))
    }

    /// Checks credentials and issues a new token.
    #[tracing::instrument(skip(self, fields), fields(email = ?fields.email))]
    pub async fn login(&self, fields: &LoginFields) -> Result<(User, String), AuthServiceError> {
        let credentials = validate_login(fields).map_err(AuthServiceError::Validation)?;

        let Some(found) = self.find_by_email(&credentials.email).await? else {
            return Err(AuthServiceError::InvalidCredentials);
        };
        if !verify_password(&credentials.password, &found.password_hash)? {
            return Err(AuthServiceError::InvalidCredentials);
        }

        self.prune_expired_tokens(found.id).await?;
        let token = self.issue_token(found.id).await?;
        Ok((found.into(), token))
    }

    /// Revokes the token the current request was made with.
    #[tracing::instrument(skip(self))]
    pub async fn logout(&self, current_user: &CurrentUser) -> Result<(), AuthServiceError> {
        access_token::Entity::delete_by_id(current_user.token_id.clone())
            .exec(self.db)
            .await?;
        Ok(())
    }

    /// Resolves a bearer token to the user it was issued to.
    ///
    /// The signature and expiry must check out and the token must not have been revoked.
    #[tracing::instrument(skip(self, token))]
    pub async fn authenticate(&self, token: &str) -> Result<CurrentUser, AuthServiceError> {
        let claims =
            decode_jwt(token, self.jwt_secret).map_err(|_| AuthServiceError::Unauthenticated)?;

        let issued = access_token::Entity::find_by_id(claims.jti.clone())
            .filter(access_token::Column::UserId.eq(claims.user_id))
            .filter(access_token::Column::ExpiresAt.gt(now()))
            .one(self.db)
            .await?;

        match issued {
            Some(_) => Ok(CurrentUser::new(claims.user_id, claims.jti)),
            None => Err(AuthServiceError::Unauthenticated),
        }
    }

    /// Returns the current user together with the tasks they own.
    #[tracing::instrument(skip(self))]
    pub async fn current_user(
        &self,
        current_user: &CurrentUser,
    ) -> Result<(User, Vec<Task>), AuthServiceError> {
        let found = user::Entity::find_by_id(current_user.id)
            .one(self.db)
            .await?
            .ok_or(AuthServiceError::Unauthenticated)?;

        let tasks = task::Entity::find()
            .filter(task::Column::UserId.eq(found.id))
            .order_by_asc(task::Column::Id)
            .all(self.db)
            .await?
            .into_iter()
            .map(|model| model.into_task(found.name.clone()))
            .collect();

        Ok((found.into(), tasks))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, DbErr> {
        user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(self.db)
            .await
    }

    async fn issue_token(&self, user_id: UserId) -> Result<String, AuthServiceError> {
        let jti = uuid::Uuid::new_v4().to_string();
        let created_at = now();
        let active_model = access_token::ActiveModel {
            id: ActiveValue::Set(jti.clone()),
            user_id: ActiveValue::Set(user_id),
            created_at: ActiveValue::Set(created_at),
            expires_at: ActiveValue::Set(created_at + self.token_ttl),
        };
        active_model.insert(self.db).await?;

        Ok(encode_jwt(user_id, jti, self.jwt_secret, self.token_ttl)?)
    }

    async fn prune_expired_tokens(&self, user_id: UserId) -> Result<(), DbErr> {
        let result = access_token::Entity::delete_many()
            .filter(access_token::Column::UserId.eq(user_id))
            .filter(access_token::Column::ExpiresAt.lt(now()))
            .exec(self.db)
            .await?;
        if result.rows_affected > 0 {
            tracing::debug!(user_id, pruned = result.rows_affected, "Pruned expired tokens");
        }
        Ok(())
    }
}

fn email_taken() -> AuthServiceError {
    let mut errors = ValidationErrors::new();
    errors.add("email", "The email has already been taken.");
    AuthServiceError::Validation(errors)
}
