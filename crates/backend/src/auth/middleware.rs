//! Route gate for pages that need a logged-in user.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use shared_types::User;

use crate::error::{ApiError, StoreError};
use crate::AppState;

/// Where anonymous visitors are sent.
pub const LANDING_PATH: &str = "/";

/// Resolve the user behind the request's session cookie.
///
/// A missing, forged, expired or orphaned session yields `Ok(None)`; only
/// store failures are errors.
pub async fn current_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<User>, StoreError> {
    let Some(session_id) = state.cookies.session_id(headers) else {
        return Ok(None);
    };

    state.auth.sessions().current_user(&session_id).await
}

/// Middleware function that requires a logged-in user.
///
/// Use with `axum::middleware::from_fn_with_state`. On success the `User` is
/// inserted into the request extensions; anonymous requests are redirected
/// to the landing page.
pub async fn require_login(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match current_user(&state, request.headers()).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => Redirect::to(LANDING_PATH).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
