//! Session and reset tokens, password hashing, and the bearer-token extractor.

use std::sync::Arc;

use anyhow::{bail, Context};
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;
use crate::models::User;
use crate::server::AppError;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to encode token: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),

    #[error("token expired")]
    Expired,

    #[error("invalid token")]
    Invalid,

    #[error("token was issued for '{0}'")]
    WrongPurpose(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    Session,
    Reset,
}

impl TokenPurpose {
    fn as_str(self) -> &'static str {
        match self {
            TokenPurpose::Session => "session",
            TokenPurpose::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub email: String,
    pub name: String,
    pub purpose: String,
    pub iat: u64,
    pub exp: u64,
}

/// Issues and checks HS256 tokens for both sessions and password resets.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_ttl_secs: u64,
    reset_ttl_secs: u64,
}

impl TokenService {
    pub fn new(secret: &str, session_ttl_secs: u64, reset_ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            session_ttl_secs,
            reset_ttl_secs,
        }
    }

    /// Reads the signing secret from the environment variable named in config.
    pub fn from_config(config: &AuthConfig) -> anyhow::Result<Self> {
        let secret = std::env::var(&config.jwt_secret_env).with_context(|| {
            format!(
                "JWT secret not set: export {} before starting the server",
                config.jwt_secret_env
            )
        })?;
        if secret.trim().is_empty() {
            bail!("JWT secret in {} is empty", config.jwt_secret_env);
        }
        Ok(Self::new(
            &secret,
            config.session_ttl_secs,
            config.reset_ttl_secs,
        ))
    }

    pub fn issue_session(&self, user: &User) -> Result<String, TokenError> {
        self.issue(user, TokenPurpose::Session, self.session_ttl_secs)
    }

    pub fn issue_reset(&self, user: &User) -> Result<String, TokenError> {
        self.issue(user, TokenPurpose::Reset, self.reset_ttl_secs)
    }

    fn issue(&self, user: &User, purpose: TokenPurpose, ttl_secs: u64) -> Result<String, TokenError> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            purpose: purpose.as_str().to_string(),
            iat: now,
            exp: now + ttl_secs,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Checks signature, expiry and that the token was issued for `purpose`.
    pub fn verify(&self, token: &str, purpose: TokenPurpose) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default()).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            },
        )?;
        if data.claims.purpose != purpose.as_str() {
            return Err(TokenError::WrongPurpose(data.claims.purpose));
        }
        Ok(data.claims)
    }
}

/// bcrypt is CPU-bound, so hashing runs on the blocking pool.
pub async fn hash_password(password: &str, cost: u32) -> anyhow::Result<String> {
    let password = password.to_string();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .context("password hashing task aborted")??;
    Ok(hash)
}

/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: &str, hash: &str) -> bool {
    let password = password.to_string();
    let hash = hash.to_string();
    matches!(
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await,
        Ok(Ok(true))
    )
}

/// The caller behind a valid `Authorization: Bearer <session token>` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<TokenService>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;

        let tokens = Arc::<TokenService>::from_ref(state);
        let claims = tokens
            .verify(token, TokenPurpose::Session)
            .map_err(|e| AppError::unauthorized(e.to_string()))?;

        Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
        })
    }
}
