//! Signed session and OAuth-state cookies.

use std::time::Duration;

use axum::http::{header, HeaderMap};
use cookie::{Cookie, CookieJar, Key, SameSite};

use crate::config::{ConfigError, MIN_SESSION_SECRET_LEN};

use super::session::SessionId;

pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// Lifetime of the `oauth_state` cookie; a login must finish within it.
const OAUTH_STATE_MAX_AGE: Duration = Duration::from_secs(10 * 60);

/// Builds and verifies the cookies the app issues.
///
/// Values are signed with a key derived from `SESSION_SECRET`, so a
/// tampered or forged cookie reads as absent.
#[derive(Clone)]
pub struct CookieSettings {
    key: Key,
    session_name: String,
    secure: bool,
    session_max_age: Duration,
}

impl CookieSettings {
    pub fn new(
        secret: &str,
        session_name: impl Into<String>,
        secure: bool,
        session_max_age: Duration,
    ) -> Result<Self, ConfigError> {
        if secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(ConfigError::Invalid {
                var: "SESSION_SECRET",
                reason: format!("must be at least {} bytes", MIN_SESSION_SECRET_LEN),
            });
        }

        Ok(Self {
            key: Key::derive_from(secret.as_bytes()),
            session_name: session_name.into(),
            secure,
            session_max_age,
        })
    }

    /// `Set-Cookie` value carrying a freshly issued session id.
    pub fn session_cookie(&self, session_id: &SessionId) -> String {
        self.signed(&self.session_name, session_id.as_str(), self.session_max_age)
    }

    /// `Set-Cookie` value that removes the session cookie.
    pub fn clear_session_cookie(&self) -> String {
        self.removal(&self.session_name)
    }

    pub fn state_cookie(&self, state: &str) -> String {
        self.signed(OAUTH_STATE_COOKIE, state, OAUTH_STATE_MAX_AGE)
    }

    pub fn clear_state_cookie(&self) -> String {
        self.removal(OAUTH_STATE_COOKIE)
    }

    /// Verified session id from the request, if any.
    pub fn session_id(&self, headers: &HeaderMap) -> Option<SessionId> {
        self.verified_value(headers, &self.session_name)
            .map(SessionId::from)
    }

    /// Verified OAuth state from the request, if any.
    pub fn oauth_state(&self, headers: &HeaderMap) -> Option<String> {
        self.verified_value(headers, OAUTH_STATE_COOKIE)
    }

    fn base(&self, name: &str, value: &str, max_age: Duration) -> Cookie<'static> {
        Cookie::build((name.to_string(), value.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(cookie::time::Duration::seconds(
                i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX),
            ))
            .build()
    }

    fn signed(&self, name: &str, value: &str, max_age: Duration) -> String {
        let mut jar = CookieJar::new();
        jar.signed_mut(&self.key).add(self.base(name, value, max_age));
        jar.get(name).map(|c| c.to_string()).unwrap_or_default()
    }

    fn removal(&self, name: &str) -> String {
        self.base(name, "", Duration::ZERO).to_string()
    }

    fn verified_value(&self, headers: &HeaderMap, name: &str) -> Option<String> {
        let mut jar = CookieJar::new();

        for cookie_header in headers.get_all(header::COOKIE) {
            let Ok(cookie_header) = cookie_header.to_str() else {
                continue;
            };
            for cookie_str in cookie_header.split(';') {
                if let Ok(cookie) = Cookie::parse(cookie_str.trim().to_string()) {
                    if cookie.name() == name {
                        jar.add_original(cookie);
                    }
                }
            }
        }

        jar.signed(&self.key)
            .get(name)
            .map(|c| c.value().to_string())
    }
}
