use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    models::Actor,
    repository::RepositoryState,
};

/// Claims
///
/// Payload expected inside a bearer token. Tokens are issued elsewhere; this
/// service only validates them.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the actor's id in the `users` table.
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request.
///
/// Resolution order:
/// 1. In `Env::Local`, an `x-user-id` header naming an existing actor.
/// 2. `Authorization: Bearer <jwt>`, validated against `AppConfig::jwt_secret`.
///
/// In both cases the actor (and their roles) is re-read from the repository, so
/// a deleted or demoted user loses access immediately.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub actor: Actor,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|raw| Uuid::parse_str(raw).ok());

            if let Some(user_id) = bypass_id {
                if let Some(actor) = repo.get_actor(user_id).await? {
                    return Ok(AuthUser { actor });
                }
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!("rejected bearer token: {:?}", e.kind());
            AppError::Unauthorized
        })?;

        let actor = repo
            .get_actor(token_data.claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser { actor })
    }
}

/// AdminUser
///
/// `AuthUser` restricted to administrators. This is the gate in front of comment
/// review and configuration updates; the moderation workflow itself does not
/// re-check roles.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub actor: Actor,
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser { actor } = AuthUser::from_request_parts(parts, state).await?;
        AdminUser::try_from(actor)
    }
}

impl TryFrom<Actor> for AdminUser {
    type Error = AppError;

    fn try_from(actor: Actor) -> Result<Self, Self::Error> {
        if actor.is_admin() {
            Ok(AdminUser { actor })
        } else {
            tracing::warn!(actor_id = %actor.id, "administrator role required");
            Err(AppError::Forbidden("administrator role required".to_string()))
        }
    }
}
