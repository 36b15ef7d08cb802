//! Request guards.
//!
//! Authentication itself lives at the edge: the API gateway resolves the
//! caller and injects a stable user id as `x-user-id`. This service only
//! performs ownership checks against that already-resolved id.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The resolved caller identity, extracted from the gateway-injected header.
#[derive(Debug, Clone, Copy)]
pub struct AuthedUser {
    pub id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::NotAuthorized)?;
        let id = Uuid::parse_str(raw).map_err(|_| AppError::NotAuthorized)?;
        Ok(AuthedUser { id })
    }
}
