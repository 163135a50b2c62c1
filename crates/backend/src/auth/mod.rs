//! Authentication module for Google OAuth login with server-side sessions.
//!
//! This module provides:
//! - The Google authorization-code client (`IdentityProvider`)
//! - Session issue / lookup / teardown (`SessionManager`)
//! - Login orchestration and user reconciliation (`Authenticator`)
//! - Signed cookies and the `require_login` route gate

mod cookies;
mod handlers;
mod middleware;
mod provider;
mod service;
mod session;

pub use cookies::{CookieSettings, OAUTH_STATE_COOKIE};
pub use handlers::{
    auth_callback, auth_google, auth_logout, AuthCallbackParams, AFTER_LOGIN_PATH,
};
pub use middleware::{current_user, require_login, LANDING_PATH};
pub use provider::{
    GoogleEndpoints, GoogleProvider, IdentityProvider, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL,
    GOOGLE_USERINFO_URL, LOGIN_SCOPES,
};
pub use service::{AuthorizationRequest, Authenticator};
pub use session::{spawn_session_pruning, SessionId, SessionManager};
