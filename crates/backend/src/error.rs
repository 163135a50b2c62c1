//! Error types for the login backend.
//!
//! `StoreError` and `AuthError` describe failures of the stores and of the
//! OAuth handshake. `ApiError` is what handlers return when a request cannot
//! be answered with a redirect; it implements `IntoResponse` so handlers can
//! use `?` naturally.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Failure of the user store or the session store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database connection pool error
    #[error("Database connection error")]
    ConnectionPool(#[source] diesel_async::pooled_connection::deadpool::PoolError),

    /// Database query error
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Store could not be reached for another reason
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<diesel_async::pooled_connection::deadpool::PoolError> for StoreError {
    fn from(err: diesel_async::pooled_connection::deadpool::PoolError) -> Self {
        StoreError::ConnectionPool(err)
    }
}

/// Failure to turn a provider callback into an authenticated user.
///
/// Never shown to the browser; the callback handler logs it and redirects to
/// the landing page.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The provider refused the authorization code or returned an error
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// Transport failure or timeout talking to the provider
    #[error("Provider request failed: {0}")]
    Provider(#[from] reqwest::Error),

    /// The profile did not carry a field we need
    #[error("Provider profile is missing {0}")]
    MissingProfileField(&'static str),

    /// The callback did not carry the state we issued
    #[error("OAuth state mismatch")]
    StateMismatch,

    /// The provider redirected back with an error instead of a code
    #[error("Provider denied authorization: {0}")]
    Denied(String),

    /// User reconciliation could not be completed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error type for handlers that cannot answer with a redirect
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            ApiError::Store(StoreError::ConnectionPool(e)) => {
                tracing::error!("Connection pool error: {:?}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Database connection unavailable",
                )
            }
            ApiError::Store(e) => {
                tracing::error!("Store error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database operation failed",
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_message.to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
