//! In-memory store implementations.
//!
//! Used by the test suites and by `STORE_BACKEND=memory` for local runs
//! without a database. Contents are lost when the process exits.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_types::{ProviderProfile, User};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::repository::{SessionStore, UserStore};

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    /// Delete a user outside of the login flow.
    pub async fn remove(&self, id: Uuid) -> Option<User> {
        self.users.write().await.remove(&id)
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_provider_id(&self, provider_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.provider_id == provider_id)
            .cloned())
    }

    async fn insert_if_absent(
        &self,
        profile: &ProviderProfile,
    ) -> Result<(User, bool), StoreError> {
        // Lookup and insert happen under one write guard.
        let mut users = self.users.write().await;

        if let Some(existing) = users.values().find(|u| u.provider_id == profile.provider_id) {
            return Ok((existing.clone(), false));
        }

        let user = User::from_profile(Uuid::new_v4(), profile.clone(), Utc::now());
        users.insert(user.id, user.clone());
        Ok((user, true))
    }
}

struct SessionRecord {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.sessions.write().await.insert(
            session_id.to_string(),
            SessionRecord {
                user_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, session_id: &str, now: DateTime<Utc>) -> Result<Option<Uuid>, StoreError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(session_id)
            .filter(|record| record.expires_at > now)
            .map(|record| record.user_id))
    }

    async fn remove(&self, session_id: &str) -> Result<(), StoreError> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }

    async fn remove_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, record| record.expires_at > now);
        Ok(before - sessions.len())
    }
}
