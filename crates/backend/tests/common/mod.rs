#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use tower::ServiceExt;
use uuid::Uuid;

use login_backend::auth::{Authenticator, CookieSettings, IdentityProvider, SessionManager};
use login_backend::error::{AuthError, StoreError};
use login_backend::memory::{InMemorySessionStore, InMemoryUserStore};
use login_backend::repository::{SessionStore, UserStore};
use login_backend::routes::app_routes;
use login_backend::AppState;
use shared_types::ProviderProfile;

pub const SECRET: &str = "integration-test-session-secret-0123456789";

/// Provider that accepts a fixed set of authorization codes.
pub struct StubProvider {
    profiles: HashMap<String, ProviderProfile>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self {
            profiles: HashMap::new(),
        }
    }

    pub fn with_code(mut self, code: &str, profile: ProviderProfile) -> Self {
        self.profiles.insert(code.to_string(), profile);
        self
    }
}

#[async_trait]
impl IdentityProvider for StubProvider {
    fn authorization_url(&self, state: &str) -> String {
        format!("https://accounts.test/o/oauth2/auth?scope=profile%20email&state={}", state)
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderProfile, AuthError> {
        self.profiles
            .get(code)
            .cloned()
            .ok_or_else(|| AuthError::TokenExchange("400 - invalid_grant".to_string()))
    }
}

/// Session store whose backend is unreachable.
pub struct UnavailableSessionStore;

#[async_trait]
impl SessionStore for UnavailableSessionStore {
    async fn insert(&self, _: &str, _: Uuid, _: DateTime<Utc>) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("session store down".to_string()))
    }

    async fn get(&self, _: &str, _: DateTime<Utc>) -> Result<Option<Uuid>, StoreError> {
        Err(StoreError::Unavailable("session store down".to_string()))
    }

    async fn remove(&self, _: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("session store down".to_string()))
    }

    async fn remove_expired(&self, _: DateTime<Utc>) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("session store down".to_string()))
    }
}

pub fn ada() -> ProviderProfile {
    ProviderProfile {
        provider_id: "g-123".to_string(),
        display_name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        image_url: Some("http://example.com/ada.png".to_string()),
    }
}

pub fn cookie_settings() -> CookieSettings {
    CookieSettings::new(SECRET, "sid", false, Duration::from_secs(3600)).unwrap()
}

pub struct TestApp {
    pub router: Router,
    pub users: Arc<InMemoryUserStore>,
    pub sessions: Arc<InMemorySessionStore>,
}

impl TestApp {
    pub fn new(provider: StubProvider) -> Self {
        let users = Arc::new(InMemoryUserStore::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let router = build_router(provider, users.clone(), sessions.clone());

        Self {
            router,
            users,
            sessions,
        }
    }

    pub async fn get(&self, uri: &str, cookies: &[String]) -> Response<Body> {
        send(&self.router, uri, cookies).await
    }

    /// Run `/auth/google` then the callback with `code`; returns the callback
    /// response.
    pub async fn login(&self, code: &str, cookies: &[String]) -> Response<Body> {
        login(&self.router, code, cookies).await
    }
}

pub fn build_router(
    provider: StubProvider,
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
) -> Router {
    let manager = SessionManager::new(sessions, users.clone(), Duration::from_secs(3600));
    let auth = Authenticator::new(Arc::new(provider), users, manager);
    app_routes(AppState::new(auth, cookie_settings()))
}

pub async fn send(router: &Router, uri: &str, cookies: &[String]) -> Response<Body> {
    let mut builder = Request::builder().uri(uri);
    if !cookies.is_empty() {
        builder = builder.header(header::COOKIE, cookies.join("; "));
    }

    router
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn login(router: &Router, code: &str, cookies: &[String]) -> Response<Body> {
    let start = send(router, "/auth/google", cookies).await;
    let state = location(&start)
        .split("state=")
        .nth(1)
        .expect("authorization url carries state")
        .to_string();

    let mut callback_cookies = cookies.to_vec();
    callback_cookies.extend(cookie_pair(&start, "oauth_state"));

    send(
        router,
        &format!("/auth/google/callback?code={}&state={}", code, state),
        &callback_cookies,
    )
    .await
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("response has a Location header")
        .to_str()
        .unwrap()
        .to_string()
}

pub fn assert_redirect(response: &Response<Body>, to: &str) {
    assert!(
        response.status().is_redirection(),
        "expected redirect, got {}",
        response.status()
    );
    assert_eq!(location(response), to);
}

/// `name=value` of the cookie `name` set by the response, if any.
pub fn cookie_pair(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with(&format!("{}=", name)))
        .map(str::to_string)
}

/// Session cookie set by a response, excluding removal cookies.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    cookie_pair(response, "sid").filter(|pair| pair != "sid=")
}

pub async fn body_text(response: Response<Body>) -> String {
    use http_body_util::BodyExt;

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn assert_ok(response: &Response<Body>) {
    assert_eq!(response.status(), StatusCode::OK);
}
