use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::middleware::Next;
use axum::response::Response;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::AuthFileConfig;
use crate::error::AppError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Name of the admin session cookie.
pub const SESSION_COOKIE: &str = "admin_session";

/// Message signed with the admin token to produce the session cookie value.
const SESSION_LABEL: &[u8] = b"campus-arena admin session v1";

/// Admin gate configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// Shared admin secret. None = every admin request is rejected.
    pub admin_token: Option<String>,
    pub cookie_max_age_secs: u64,
    pub secure_cookie: bool,
}

impl From<&AuthFileConfig> for AuthConfig {
    fn from(file: &AuthFileConfig) -> Self {
        Self {
            admin_token: file
                .admin_token
                .clone()
                .filter(|t| !t.trim().is_empty()),
            cookie_max_age_secs: file.cookie_max_age_secs,
            secure_cookie: file.secure_cookie,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("admin_token", &self.admin_token.as_ref().map(|_| "<redacted>"))
            .field("cookie_max_age_secs", &self.cookie_max_age_secs)
            .field("secure_cookie", &self.secure_cookie)
            .finish()
    }
}

/// Hex HMAC-SHA256 of the session label keyed with the admin token.
pub fn session_tag(token: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(token.as_bytes()).ok()?;
    mac.update(SESSION_LABEL);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a session cookie value against the token.
pub fn verify_session(token: &str, cookie: &str) -> bool {
    let Ok(provided) = hex::decode(cookie) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(token.as_bytes()) else {
        return false;
    };
    mac.update(SESSION_LABEL);
    mac.verify_slice(&provided).is_ok()
}

/// Value of the named cookie from the `Cookie` header(s).
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim())
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Compare a presented token with the configured one without leaking where
/// they differ, by comparing their session tags.
pub fn token_matches(expected: &str, provided: &str) -> bool {
    session_tag(provided).is_some_and(|tag| verify_session(expected, &tag))
}

impl AuthConfig {
    /// The configured admin token, if it is usable. A blank token counts as
    /// none, which keeps the admin gate closed.
    pub fn expected_token(&self) -> Option<&str> {
        self.admin_token.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Check a presented token. Empty presentations never match.
    pub fn accepts_token(&self, provided: &str) -> bool {
        !provided.trim().is_empty()
            && self
                .expected_token()
                .is_some_and(|expected| token_matches(expected, provided))
    }

    /// True when the request carries a valid session cookie or bearer token.
    pub fn is_admin(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = self.expected_token() else {
            return false;
        };
        if let Some(token) = bearer(headers)
            && self.accepts_token(token)
        {
            return true;
        }
        cookie_value(headers, SESSION_COOKIE).is_some_and(|c| verify_session(expected, c))
    }

    /// `Set-Cookie` value establishing an admin session.
    pub fn session_cookie(&self, tag: &str) -> String {
        self.cookie(tag, self.cookie_max_age_secs)
    }

    /// `Set-Cookie` value that clears the admin session.
    pub fn clear_cookie(&self) -> String {
        self.cookie("", 0)
    }

    fn cookie(&self, value: &str, max_age: u64) -> String {
        let mut cookie =
            format!("{SESSION_COOKIE}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}");
        if self.secure_cookie {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Axum middleware guarding admin routes.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.auth.is_admin(request.headers()) {
        tracing::debug!(path = %request.uri().path(), "rejected unauthenticated admin request");
        return Err(AppError::Unauthorized("admin session required".to_string()));
    }
    Ok(next.run(request).await)
}
