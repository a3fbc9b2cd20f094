//! Actor identity extraction.
//!
//! Token issuance and verification are an external collaborator
//! (Firebase-style auth at the edge); by the time a request reaches this
//! service the gateway has resolved the caller into `X-Actor-Id` and
//! `X-Actor-Role` headers. The extractor turns those into a typed
//! [`Actor`]; missing or malformed headers reject with 401.

use std::str::FromStr;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use doorstep_core::models::{Actor, ActorRole};
use doorstep_core::AppError;
use uuid::Uuid;

use crate::error::HttpAppError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Extractor wrapper for the authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct ActorContext(pub Actor);

impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header_value(parts, ACTOR_ID_HEADER)?;
        let role = header_value(parts, ACTOR_ROLE_HEADER)?;

        let id = Uuid::parse_str(&id).map_err(|_| {
            HttpAppError(AppError::Unauthorized(
                "X-Actor-Id must be a UUID".to_string(),
            ))
        })?;
        let role = ActorRole::from_str(&role).map_err(|_| {
            HttpAppError(AppError::Unauthorized(
                "X-Actor-Role must be 'host' or 'agent'".to_string(),
            ))
        })?;

        Ok(ActorContext(Actor { id, role }))
    }
}

fn header_value(parts: &Parts, name: &str) -> Result<String, HttpAppError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| {
            HttpAppError(AppError::Unauthorized(format!(
                "Missing or invalid {} header",
                name
            )))
        })
}
