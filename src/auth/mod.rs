//! Viewer access policy.
//!
//! Session issuance lives outside this service; the HTTP layer only asks
//! whether a request may read signals.

use axum::http::{header, HeaderMap};

pub trait AccessPolicy: Send + Sync {
    /// `access_token` is the optional query-string token (WebSocket upgrades
    /// from browsers cannot carry an `Authorization` header)
    fn is_authorized(&self, headers: &HeaderMap, access_token: Option<&str>) -> bool;
}

/// Everyone may view
pub struct OpenAccess;

impl AccessPolicy for OpenAccess {
    fn is_authorized(&self, _headers: &HeaderMap, _access_token: Option<&str>) -> bool {
        true
    }
}

/// A single shared dashboard token
pub struct TokenAccess {
    token: String,
}

impl TokenAccess {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    fn matches(&self, candidate: &str) -> bool {
        let expected = self.token.as_bytes();
        let candidate = candidate.as_bytes();
        if expected.len() != candidate.len() {
            return false;
        }
        expected
            .iter()
            .zip(candidate)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl AccessPolicy for TokenAccess {
    fn is_authorized(&self, headers: &HeaderMap, access_token: Option<&str>) -> bool {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token);

        bearer.is_some_and(|token| self.matches(token))
            || access_token.is_some_and(|token| self.matches(token))
    }
}

/// Credentials of an `Authorization: Bearer <token>` header; the scheme is case-insensitive
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
}

/// Policy for an optional configured token
pub fn policy_from_token(token: Option<String>) -> Box<dyn AccessPolicy> {
    match token {
        Some(token) => Box::new(TokenAccess::new(token)),
        None => Box::new(OpenAccess),
    }
}
