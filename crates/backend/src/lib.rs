//! Google sign-in web backend.
//!
//! Users log in through Google's OAuth2 authorization-code flow. The first
//! login stores a user record; every login gets a server-side session whose
//! signed id travels in a cookie. `/dashboard` is only served to requests
//! carrying a live session.

use std::sync::Arc;

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
mod handlers;
pub mod memory;
mod models;
pub mod repository;
pub mod routes;
mod schema;

use auth::{Authenticator, CookieSettings};

/// Handles shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<Authenticator>,
    pub cookies: Arc<CookieSettings>,
}

impl AppState {
    pub fn new(auth: Authenticator, cookies: CookieSettings) -> Self {
        Self {
            auth: Arc::new(auth),
            cookies: Arc::new(cookies),
        }
    }
}
