//! Thin admin authentication for the moderation surface
//!
//! Session/token issuance is owned by an external identity provider; the
//! services here only need the boolean fact "the caller is staff". That
//! fact is established by a static bearer token checked by the
//! `RequireAdmin` extractor.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::problem::Problem;

/// Configured admin bearer token, registered as a shared service
#[derive(Clone)]
pub struct AdminToken {
    token: String,
}

impl AdminToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        !self.token.is_empty() && self.token == candidate
    }
}

/// Proof that the request carried a valid admin token
#[derive(Clone, Debug)]
pub struct AdminAuth;

/// Extractor that rejects requests without a valid admin bearer token
pub struct RequireAdmin(pub AdminAuth);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = Problem;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let expected = parts
            .extensions
            .get::<Arc<AdminToken>>()
            .cloned()
            .ok_or_else(|| {
                Problem::unauthorized().detail("Authentication is not configured on this server")
            })?;

        let header = parts
            .headers
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            .ok_or_else(Problem::unauthorized)?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            Problem::unauthorized().detail("Expected a bearer token in the Authorization header")
        })?;

        if !expected.matches(token) {
            return Err(Problem::forbidden().detail("Invalid admin token"));
        }

        Ok(RequireAdmin(AdminAuth))
    }
}
