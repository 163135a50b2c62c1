//! Store traits for users and sessions.
//!
//! Handlers and the auth service only see these traits, so the PostgreSQL
//! implementations below and the in-memory ones in [`crate::memory`] are
//! interchangeable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_types::{ProviderProfile, User};
use uuid::Uuid;

use crate::db::{self, DbPool};
use crate::error::StoreError;

/// Persistence of user records.
///
/// # Contract
///
/// Implementations must:
/// - Keep at most one user per `provider_id`
/// - Return `Ok(None)` for unknown users rather than an error
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Get a user by the id the store assigned to it.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Get a user by the identity provider's subject id.
    async fn find_by_provider_id(&self, provider_id: &str) -> Result<Option<User>, StoreError>;

    /// Store a new user for `profile` unless its provider id is already
    /// known. Returns the stored user and `true` if it was created by this
    /// call. Must be atomic with respect to concurrent calls.
    async fn insert_if_absent(&self, profile: &ProviderProfile)
        -> Result<(User, bool), StoreError>;
}

/// Persistence of `session id -> user id` mappings.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// User id of the session, or `None` if it is unknown or expired at `now`.
    async fn get(&self, session_id: &str, now: DateTime<Utc>) -> Result<Option<Uuid>, StoreError>;

    /// Remove a session. Removing an unknown session is not an error.
    async fn remove(&self, session_id: &str) -> Result<(), StoreError>;

    /// Drop every session expired at `now`, returning how many were removed.
    async fn remove_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}

// ============================================================================
// PostgreSQL implementations
// ============================================================================

/// Users table repository
#[derive(Clone)]
pub struct PgUserStore {
    pool: DbPool,
}

impl PgUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.get().await?;
        db::users::get_by_id(&mut conn, id).await
    }

    async fn find_by_provider_id(&self, provider_id: &str) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.get().await?;
        db::users::get_by_provider_id(&mut conn, provider_id).await
    }

    async fn insert_if_absent(
        &self,
        profile: &ProviderProfile,
    ) -> Result<(User, bool), StoreError> {
        let mut conn = self.pool.get().await?;
        db::users::insert_if_absent(&mut conn, profile).await
    }
}

/// Sessions table repository
#[derive(Clone)]
pub struct PgSessionStore {
    pool: DbPool,
}

impl PgSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        db::sessions::create(&mut conn, session_id, user_id, expires_at).await
    }

    async fn get(&self, session_id: &str, now: DateTime<Utc>) -> Result<Option<Uuid>, StoreError> {
        let mut conn = self.pool.get().await?;
        db::sessions::get_user_id(&mut conn, session_id, now).await
    }

    async fn remove(&self, session_id: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        db::sessions::delete(&mut conn, session_id).await
    }

    async fn remove_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut conn = self.pool.get().await?;
        db::sessions::delete_expired(&mut conn, now).await
    }
}
