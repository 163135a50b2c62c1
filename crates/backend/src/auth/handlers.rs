//! Authentication HTTP handlers.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::error::{ApiResult, AuthError};
use crate::AppState;

use super::middleware::LANDING_PATH;
use super::session::SessionId;

/// Where the browser goes after a successful login.
pub const AFTER_LOGIN_PATH: &str = "/dashboard";

/// Start Google OAuth login flow.
///
/// Redirects to Google's consent page and remembers the `state` we sent in a
/// short-lived signed cookie.
pub async fn auth_google(State(state): State<AppState>) -> Response {
    let request = state.auth.begin_authentication();

    (
        AppendHeaders([(header::SET_COOKIE, state.cookies.state_cookie(&request.state))]),
        Redirect::to(&request.url),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct AuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Handle Google OAuth callback.
///
/// Exchanges the authorization code, finds or creates the user and sets the
/// session cookie. Any failure sends the browser back to the landing page
/// without a session.
pub async fn auth_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<AuthCallbackParams>,
) -> Response {
    let clear_state = state.cookies.clear_state_cookie();

    match handle_callback_inner(&state, &headers, params).await {
        Ok(session_id) => (
            AppendHeaders([
                (header::SET_COOKIE, clear_state),
                (header::SET_COOKIE, state.cookies.session_cookie(&session_id)),
            ]),
            Redirect::to(AFTER_LOGIN_PATH),
        )
            .into_response(),
        Err(e) => {
            match &e {
                AuthError::Store(_) => tracing::error!("Auth callback error: {:?}", e),
                _ => tracing::warn!("Auth callback rejected: {}", e),
            }
            (
                AppendHeaders([(header::SET_COOKIE, clear_state)]),
                Redirect::to(LANDING_PATH),
            )
                .into_response()
        }
    }
}

async fn handle_callback_inner(
    state: &AppState,
    headers: &HeaderMap,
    params: AuthCallbackParams,
) -> Result<SessionId, AuthError> {
    if let Some(error) = params.error {
        return Err(AuthError::Denied(error));
    }

    let expected_state = state
        .cookies
        .oauth_state(headers)
        .ok_or(AuthError::StateMismatch)?;
    if params.state.as_deref() != Some(expected_state.as_str()) {
        return Err(AuthError::StateMismatch);
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AuthError::TokenExchange("callback carried no code".to_string()))?;

    let user = state.auth.complete_authentication(&code).await?;

    // Never carry a pre-login session over into the new login
    if let Some(previous) = state.cookies.session_id(headers) {
        if let Err(e) = state.auth.end_session(&previous).await {
            tracing::warn!("Failed to end previous session: {:?}", e);
        }
    }

    let session_id = state.auth.establish_session(&user).await?;
    tracing::info!("Successful login for: {}", user.email);

    Ok(session_id)
}

/// Logout - destroy the session and clear its cookie.
///
/// Store failures surface as an error response: a session that could not be
/// destroyed must not look logged out.
pub async fn auth_logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    if let Some(session_id) = state.cookies.session_id(&headers) {
        state.auth.end_session(&session_id).await?;
        tracing::info!("Session ended");
    }

    Ok((
        AppendHeaders([(header::SET_COOKIE, state.cookies.clear_session_cookie())]),
        Redirect::to(LANDING_PATH),
    )
        .into_response())
}
