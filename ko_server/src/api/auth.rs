//! Caller identity extraction for bracket mutations.
//!
//! Bracket endpoints authorize against the event owner or an administrator.
//! The caller's identity arrives in request headers, set by the gateway that
//! fronts this service:
//!
//! ```text
//! x-actor-id: 42
//! x-actor-admin: true
//! ```
//!
//! Handlers take a [`CallerIdentity`] argument; requests without a parseable
//! `x-actor-id` are rejected with `401 Unauthorized` before the handler runs.
//! Ownership checks themselves happen inside the bracket operations, which
//! return authorization errors mapped to `403 Forbidden`.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, request::Parts},
    response::Json,
};
use knockout::Actor;

use super::ErrorResponse;

/// Header carrying the caller's user id
pub const ACTOR_ID_HEADER: &str = "x-actor-id";

/// Header marking the caller as an administrator
pub const ACTOR_ADMIN_HEADER: &str = "x-actor-admin";

/// Build an actor from request headers.
///
/// Returns `None` when `x-actor-id` is missing or not an integer. The admin
/// flag is optional and defaults to false.
fn actor_from_headers(headers: &HeaderMap) -> Option<Actor> {
    let user_id = headers
        .get(ACTOR_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())?;

    let is_admin = headers
        .get(ACTOR_ADMIN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| matches!(v.trim(), "true" | "1"))
        .unwrap_or(false);

    if is_admin {
        Some(Actor::admin(user_id))
    } else {
        Some(Actor::user(user_id))
    }
}

/// Axum extractor for the authenticated caller.
#[derive(Clone, Copy, Debug)]
pub struct CallerIdentity(pub Actor);

impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers)
            .map(CallerIdentity)
            .ok_or((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Missing or invalid x-actor-id header".to_string(),
                    kind: "authorization".to_string(),
                }),
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_actor_from_headers_parses_user() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID_HEADER, HeaderValue::from_static("42"));

        let actor = actor_from_headers(&headers).unwrap();
        assert_eq!(actor.user_id, 42);
        assert!(!actor.is_admin);
    }

    #[test]
    fn test_actor_from_headers_parses_admin_flag() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID_HEADER, HeaderValue::from_static("42"));
        headers.insert(ACTOR_ADMIN_HEADER, HeaderValue::from_static("true"));
        assert!(actor_from_headers(&headers).unwrap().is_admin);

        headers.insert(ACTOR_ADMIN_HEADER, HeaderValue::from_static("1"));
        assert!(actor_from_headers(&headers).unwrap().is_admin);

        headers.insert(ACTOR_ADMIN_HEADER, HeaderValue::from_static("false"));
        assert!(!actor_from_headers(&headers).unwrap().is_admin);
    }

    #[test]
    fn test_actor_from_headers_rejects_missing_id() {
        let headers = HeaderMap::new();
        assert!(actor_from_headers(&headers).is_none());
    }

    #[test]
    fn test_actor_from_headers_rejects_garbage_id() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID_HEADER, HeaderValue::from_static("not-a-number"));
        assert!(actor_from_headers(&headers).is_none());
    }
}
