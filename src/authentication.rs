use std::sync::Arc;

use crate::{config::Config, errors::RequestError};
use anyhow::{Context, Result};
use argon2::PasswordVerifier;
use argon2::{password_hash::SaltString, Argon2, PasswordHash};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

const JWT_EXPIRY_DURATION: time::Duration = time::Duration::days(90);
pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Serialize, Deserialize)]
struct AuthClaim {
    id: i64,
    username: String,
    exp: i64,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub token: String,
}

impl AuthUser {
    /// Rejects with 403 unless this user is `owner_id`.
    pub fn ensure_owns(&self, owner_id: i64, message: &'static str) -> Result<(), RequestError> {
        if self.id == owner_id {
            Ok(())
        } else {
            Err(RequestError::Forbidden(message))
        }
    }
}

pub struct MaybeUser(pub Option<AuthUser>);

impl MaybeUser {
    pub fn get_id(&self) -> Option<i64> {
        self.0.as_ref().map(|a| a.id)
    }
}

fn config_from_parts(parts: &Parts) -> Result<Arc<Config>, RequestError> {
    parts.extensions.get::<Arc<Config>>().cloned().ok_or_else(|| {
        tracing::error!("Config extension missing from request");
        RequestError::ServerError
    })
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync + 'static,
{
    type Rejection = RequestError;
    async fn from_request_parts(
        parts: &mut Parts,
        _: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let config = config_from_parts(parts)?;

        if let Some(header) = parts.headers.get("Authorization") {
            let header = header.to_str().map_err(|_| {
                tracing::debug!("Authorization header is not valid UTF-8");
                RequestError::NotAuthorized("Invalid token")
            })?;
            let token = header
                .strip_prefix("Token ")
                .or_else(|| header.strip_prefix("Bearer "))
                .ok_or_else(|| {
                    tracing::debug!("Authorization header has an unknown scheme");
                    RequestError::NotAuthorized("Invalid token")
                })?;
            let user = verify_jwt_token(token, &config.jwt_secret)?;
            return Ok(MaybeUser(Some(user)));
        }

        // A stale page session degrades to an anonymous visitor.
        let jar = CookieJar::from_headers(&parts.headers);
        let user = jar
            .get(SESSION_COOKIE)
            .and_then(|cookie| verify_jwt_token(cookie.value(), &config.jwt_secret).ok());
        Ok(MaybeUser(user))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync + 'static,
{
    type Rejection = RequestError;
    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        match MaybeUser::from_request_parts(parts, state).await? {
            MaybeUser(Some(user)) => Ok(user),
            MaybeUser(None) => Err(RequestError::NotAuthorized(
                "Authentication credentials were not provided.",
            )),
        }
    }
}

pub fn get_jwt_token(id: i64, username: &str, secret: &str) -> Result<String> {
    let expiry_date = OffsetDateTime::now_utc() + JWT_EXPIRY_DURATION;
    let claim = AuthClaim {
        id,
        username: username.to_owned(),
        exp: expiry_date.unix_timestamp(),
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claim,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_ref()),
    )
    .context("Failed to generate jwt token")
}

pub fn verify_jwt_token(token: &str, secret: &str) -> Result<AuthUser, RequestError> {
    let token_data = jsonwebtoken::decode::<AuthClaim>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(secret.as_ref()),
        &jsonwebtoken::Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("Error verifying token: {}", e);
        RequestError::NotAuthorized("Invalid Token")
    })?;
    let claim = token_data.claims;
    if claim.exp < OffsetDateTime::now_utc().unix_timestamp() {
        return Err(RequestError::NotAuthorized("Token expired"));
    }
    Ok(AuthUser {
        id: claim.id,
        username: claim.username,
        token: token.to_string(),
    })
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(JWT_EXPIRY_DURATION)
        .finish()
}

pub async fn verify_password_argon2(password: String, hash: &str) -> Result<bool> {
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || {
        let hash = PasswordHash::new(hash.as_str())
            .map_err(|_| anyhow::anyhow!("Failed to verify password"))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok())
    })
    .await
    .context("Failed to verify password")?
}

pub async fn hash_password_argon2(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(rand::thread_rng());
        let hash = PasswordHash::generate(Argon2::default(), password, salt.as_salt())
            .map_err(|_| anyhow::anyhow!("Failed to hash password"))?;
        Ok(hash.to_string())
    })
    .await
    .context("Failed to hash password")?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_identity() {
        let token = get_jwt_token(7, "chef_mario", "secret").unwrap();
        let user = verify_jwt_token(&token, "secret").unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.username, "chef_mario");
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = get_jwt_token(7, "chef_mario", "secret").unwrap();
        assert!(matches!(
            verify_jwt_token(&token, "other"),
            Err(RequestError::NotAuthorized(_))
        ));
    }

    #[test]
    fn only_owner_passes_ownership_check() {
        let user = AuthUser {
            id: 3,
            username: "cook_sarah".into(),
            token: String::new(),
        };
        assert!(user.ensure_owns(3, "no").is_ok());
        assert!(matches!(
            user.ensure_owns(4, "no"),
            Err(RequestError::Forbidden("no"))
        ));
    }

    #[tokio::test]
    async fn password_hash_verifies() {
        let hash = hash_password_argon2("hunter22".into()).await.unwrap();
        assert!(verify_password_argon2("hunter22".into(), &hash).await.unwrap());
        assert!(!verify_password_argon2("wrong".into(), &hash).await.unwrap());
    }
}
