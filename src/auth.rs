use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    credentials::CredentialError,
    models::{Identity, User},
    repository::RepositoryState,
};

/// Claims
///
/// Payload of the HS256 bearer token issued by POST /login.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's id in the `users` table.
    pub sub: i64,
    /// Display name at issue time. Informational; the extractor re-reads the user.
    pub name: String,
    pub exp: usize,
    pub iat: usize,
}

/// issue_token
///
/// Signs a token for `user` that expires after `config.jwt_ttl_secs`.
pub fn issue_token(config: &AppConfig, user: &User) -> Result<String, CredentialError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id,
        name: user.name.clone(),
        iat: now as usize,
        exp: now.saturating_add(config.jwt_ttl_secs.max(0)) as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?)
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Handlers take it as an
/// argument; its presence is the authentication gate.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub display_name: String,
}

impl AuthUser {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            display_name: self.display_name.clone(),
        }
    }
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        AuthUser {
            id: user.id,
            display_name: user.name,
        }
    }
}

/// AuthUser Extractor Implementation
///
/// 1. In `Env::Local`, an `x-user-id` header naming an existing user is accepted.
/// 2. Otherwise a `Bearer` JWT is required and validated (signature and expiry).
/// 3. The user is re-read from the repository so deleted accounts are rejected
///    and the current display name is used for attribution.
///
/// Rejection: `401 Unauthorized` on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|raw| raw.parse::<i64>().ok());

            if let Some(user_id) = bypass_id {
                if let Ok(Some(user)) = repo.get_user(user_id).await {
                    return Ok(user.into());
                }
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            tracing::debug!("rejected bearer token: {:?}", e.kind());
            StatusCode::UNAUTHORIZED
        })?;

        let user = repo
            .get_user(token_data.claims.sub)
            .await
            .map_err(|e| {
                tracing::error!("user lookup failed during auth: {:?}", e);
                StatusCode::UNAUTHORIZED
            })?
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(user.into())
    }
}
