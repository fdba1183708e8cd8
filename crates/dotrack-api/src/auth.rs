//! # Authentication
//!
//! Every `/v1` request carries the acting user in its bearer token:
//!
//! ```text
//! Authorization: Bearer {role}:{user_uuid}:{secret}
//! ```
//!
//! The middleware parses the token into a [`CallerIdentity`] and stores it
//! in the request extensions, where handlers pick it up as an extractor.
//! When a shared secret is configured, the secret segment must match it
//! (constant-time comparison). Without one the segment is optional and
//! ignored.

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dotrack_core::{Actor, Role, UserId};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody, ErrorDetail};

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerIdentity {
    pub actor: Actor,
}

impl CallerIdentity {
    pub fn role(&self) -> Role {
        self.actor.role
    }
}

impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .copied()
            .ok_or_else(|| AppError::Unauthorized("no caller identity on request".to_string()))
    }
}

/// Authentication settings shared with the middleware via an extension.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Shared secret every token must carry. `None` disables the check.
    pub secret: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Compare two secrets without leaking where they differ.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        // Burn the same work as an equal-length compare.
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse `{role}:{user_uuid}[:{secret}]` into a caller identity.
pub fn parse_bearer_token(token: &str, expected_secret: Option<&str>) -> Result<CallerIdentity, String> {
    let mut parts = token.splitn(3, ':');
    let role = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or("bearer token is empty")?;
    let user = parts
        .next()
        .ok_or("bearer token must have the form role:user_id:secret")?;
    let secret = parts.next();

    let role = Role::from_name(role).map_err(|e| e.to_string())?;
    let user_id = Uuid::parse_str(user)
        .map(UserId::from_uuid)
        .map_err(|_| format!("invalid user id {user:?} in bearer token"))?;

    if let Some(expected) = expected_secret {
        match secret {
            Some(provided) if constant_time_token_eq(provided, expected) => {}
            _ => return Err("invalid bearer token".to_string()),
        }
    }

    Ok(CallerIdentity {
        actor: Actor::new(user_id, role),
    })
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
}

/// Resolve the caller from the `Authorization` header or reject with 401.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let config = request
        .extensions()
        .get::<AuthConfig>()
        .cloned()
        .unwrap_or_default();

    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let identity = match header_value.as_deref() {
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(token) => parse_bearer_token(token.trim(), config.secret.as_deref()),
            None => Err("authorization header must use Bearer scheme".to_string()),
        },
        None => Err("missing authorization header".to_string()),
    };

    match identity {
        Ok(identity) => {
            tracing::debug!(user = %identity.actor.user_id, role = %identity.actor.role, "caller authenticated");
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(message) => {
            tracing::warn!(uri = %request.uri(), %message, "rejected unauthenticated request");
            unauthorized_response(&message)
        }
    }
}
