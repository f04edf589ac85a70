//! Authorization for staff routes.
//!
//! Reception and desk operations (issuing, calling, closing tickets, and
//! the full waiting list with patient identification) go through
//! [`StaffAccess`], an extractor that consults the configured
//! [`AuthGate`]. Display reads and the `WebSocket` stay public.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::state::AppState;

/// How staff requests are authorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthGate {
    /// Every request is allowed.
    AllowAll,
    /// Requests must carry `Authorization: Bearer <token>`.
    StaticToken(String),
}

impl AuthGate {
    /// Gate from an optional configured token.
    pub fn from_token(token: Option<String>) -> Self {
        token.map_or(Self::AllowAll, Self::StaticToken)
    }

    /// Short name for startup logging.
    pub const fn mode(&self) -> &'static str {
        match self {
            Self::AllowAll => "allow_all",
            Self::StaticToken(_) => "static_token",
        }
    }

    /// Check the raw `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] if a token is required and the
    /// header is missing, malformed, or carries a different token.
    pub fn authorize(&self, header: Option<&str>) -> Result<(), ApiError> {
        let Self::StaticToken(expected) = self else {
            return Ok(());
        };
        let header =
            header.ok_or_else(|| ApiError::Unauthorized(String::from("missing bearer token")))?;
        let presented = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized(String::from("expected 'Bearer <token>'")))?;
        if constant_time_eq::constant_time_eq(presented.trim().as_bytes(), expected.as_bytes()) {
            Ok(())
        } else {
            Err(ApiError::Unauthorized(String::from("invalid token")))
        }
    }
}

/// Proof that the request passed the [`AuthGate`].
///
/// Add it as a handler argument to gate that route.
#[derive(Debug, Clone, Copy)]
pub struct StaffAccess;

impl FromRequestParts<Arc<AppState>> for StaffAccess {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        state.auth.authorize(header)?;
        Ok(Self)
    }
}
