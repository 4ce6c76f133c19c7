//! Caller identity extraction.
//!
//! Authentication itself lives upstream (gateway / session service); this
//! boundary only enforces that a caller identity is present. The identity is
//! used for resume-document lookups and never participates in cache keys, so
//! identical content scores identically regardless of who asks.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::errors::AppError;

const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller, extracted from the `X-User-Id` header.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let user_id = Uuid::parse_str(raw).map_err(|_| AppError::Unauthorized)?;
        Ok(AuthUser(user_id))
    }
}
