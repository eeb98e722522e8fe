//! Shared auth guard helpers.
//!
//! SYSTEM CONTEXT
//! ==============
//! Privileged code paths call [`with_auth`] or `AuthService::require_auth` and
//! let [`AuthRequired`] propagate to whatever layer owns redirects. Route
//! components use the `should_redirect_*` predicates so every page applies the
//! same login/dashboard bounce rules.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value;

use crate::net::types::AuthUser;
use crate::state::auth::{AuthService, AuthState};

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// A privileged operation ran without an active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Authentication required")]
pub struct AuthRequired;

/// Run `handler` with the current user, or fail with [`AuthRequired`].
///
/// # Errors
///
/// Returns [`AuthRequired`] when `auth` is anonymous; `handler` is not called.
pub fn with_auth<R>(
    auth: &AuthService,
    handler: impl FnOnce(AuthUser) -> R,
) -> Result<R, AuthRequired> {
    let user = auth.require_auth()?;
    Ok(handler(user))
}

/// Protected pages bounce to [`LOGIN_PATH`] once auth has settled without a user.
pub fn should_redirect_unauth(state: &AuthState) -> bool {
    !state.loading && state.user.is_none()
}

/// Login/register pages bounce to [`DASHBOARD_PATH`] once a user is present.
pub fn should_redirect_authed(state: &AuthState) -> bool {
    !state.loading && state.user.is_some()
}

/// Where a route should send the visitor, if anywhere.
pub fn redirect_target(state: &AuthState, route_requires_auth: bool) -> Option<&'static str> {
    if route_requires_auth {
        should_redirect_unauth(state).then_some(LOGIN_PATH)
    } else {
        should_redirect_authed(state).then_some(DASHBOARD_PATH)
    }
}

// =============================================================================
// TOKEN INSPECTION
// =============================================================================

/// Decode the claims segment of a JWT without verifying it.
fn jwt_claims(token: &str) -> Option<Value> {
    let mut parts = token.split('.');
    let (_header, claims, _sig) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(claims.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// The `exp` claim (seconds since the Unix epoch) of a JWT, if it has one.
#[allow(clippy::cast_possible_truncation)]
pub fn token_expiry(token: &str) -> Option<i64> {
    let exp = jwt_claims(token)?.get("exp")?.as_f64()?;
    exp.is_finite().then(|| exp.floor() as i64)
}

/// Whether `token` is expired at `now_secs`.
///
/// Tokens that are not decodable JWTs count as expired. A decodable JWT
/// without an `exp` claim never expires.
#[allow(clippy::cast_precision_loss)]
pub fn is_token_expired_at(token: &str, now_secs: i64) -> bool {
    match jwt_claims(token) {
        None => true,
        Some(claims) => claims
            .get("exp")
            .and_then(Value::as_f64)
            .is_some_and(|exp| exp < now_secs as f64),
    }
}

pub fn is_token_expired(token: &str) -> bool {
    is_token_expired_at(token, chrono::Utc::now().timestamp())
}
