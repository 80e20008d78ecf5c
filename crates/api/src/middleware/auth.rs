//! JWT bearer-token auth extractor (spec §6: "each request arrives with an
//! authenticated user identifier; the core trusts `userId` and performs
//! ownership checks thereafter").

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use practice_domain::UserId;
use practice_store::KvBackend;

use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
}

/// Verifies the bearer token and extracts the authenticated `UserId`. Only
/// the token's `sub` claim is trusted past this point; everything the core
/// does afterward is an ownership check against that id (spec §4.2).
pub fn verify_bearer(headers: &HeaderMap, jwt_secret: &str) -> Result<UserId, StatusCode> {
    let auth_header = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::warn!("JWT verification failed: {}", e);
        StatusCode::UNAUTHORIZED
    })?;

    token_data
        .claims
        .sub
        .parse::<UserId>()
        .map_err(|_| StatusCode::UNAUTHORIZED)
}

/// Axum extractor: declare `AuthUser` as a handler parameter to require and
/// parse the caller's bearer token into a `UserId`.
pub struct AuthUser(pub UserId);

impl<B: KvBackend + 'static> FromRequestParts<Arc<AppState<B>>> for AuthUser {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<B>>,
    ) -> Result<Self, Self::Rejection> {
        let user_id = verify_bearer(&parts.headers, &state.config.jwt_secret)?;
        Ok(AuthUser(user_id))
    }
}
