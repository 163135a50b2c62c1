//! Server-side sessions.
//!
//! A session maps an opaque id (the only thing the browser sees) to a user
//! id. The user record itself is looked up again on every request, so the
//! session entry stays small no matter what the user row holds.

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use shared_types::User;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::StoreError;
use crate::repository::{SessionStore, UserStore};

/// Bytes of OS randomness in a session id.
const SESSION_ID_BYTES: usize = 32;

const MIN_PRUNE_INTERVAL: Duration = Duration::from_secs(1);

/// Opaque session identifier handed to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        SessionId(random_token(SESSION_ID_BYTES))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        SessionId(value)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// URL-safe random token of `bytes` bytes of OS randomness.
pub(crate) fn random_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    users: Arc<dyn UserStore>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, users: Arc<dyn UserStore>, ttl: Duration) -> Self {
        Self { store, users, ttl }
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Issue a new session for `user_id`.
    pub async fn create(&self, user_id: Uuid) -> Result<SessionId, StoreError> {
        let session_id = SessionId::generate();
        let expires_at = self.expiry_from(Utc::now());

        self.store
            .insert(session_id.as_str(), user_id, expires_at)
            .await?;

        tracing::debug!("Created session for user {} (expires {})", user_id, expires_at);
        Ok(session_id)
    }

    /// User id stored under `session_id`, if the session exists and is live.
    pub async fn load(&self, session_id: &SessionId) -> Result<Option<Uuid>, StoreError> {
        self.store.get(session_id.as_str(), Utc::now()).await
    }

    /// Remove the session. Unknown sessions are ignored.
    pub async fn destroy(&self, session_id: &SessionId) -> Result<(), StoreError> {
        self.store.remove(session_id.as_str()).await
    }

    /// Full user record for `user_id`; `None` if the user no longer exists.
    pub async fn resolve_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let user = self.users.find_by_id(user_id).await?;
        if user.is_none() {
            tracing::info!("Session refers to missing user {}", user_id);
        }
        Ok(user)
    }

    /// `load` followed by `resolve_user`.
    pub async fn current_user(&self, session_id: &SessionId) -> Result<Option<User>, StoreError> {
        match self.load(session_id).await? {
            Some(user_id) => self.resolve_user(user_id).await,
            None => Ok(None),
        }
    }

    pub async fn prune_expired(&self) -> Result<usize, StoreError> {
        self.store.remove_expired(Utc::now()).await
    }
}

/// Periodically drop expired sessions from the store. `every` is clamped to
/// at least one second.
pub fn spawn_session_pruning(sessions: SessionManager, every: Duration) -> JoinHandle<()> {
    let every = every.max(MIN_PRUNE_INTERVAL);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match sessions.prune_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::info!("Pruned {} expired sessions", removed),
                Err(e) => tracing::error!("Failed to prune expired sessions: {:?}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemorySessionStore, InMemoryUserStore};
    use shared_types::ProviderProfile;

    fn manager_with(ttl: Duration) -> (SessionManager, Arc<InMemoryUserStore>) {
        let users = Arc::new(InMemoryUserStore::new());
        let manager = SessionManager::new(
            Arc::new(InMemorySessionStore::new()),
            users.clone(),
            ttl,
        );
        (manager, users)
    }

    async fn add_user(users: &InMemoryUserStore) -> User {
        let profile = ProviderProfile {
            provider_id: "g-123".to_string(),
            display_name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            image_url: None,
        };
        users.insert_if_absent(&profile).await.unwrap().0
    }

    #[test]
    fn test_session_ids_are_unique_and_url_safe() {
        let a = SessionId::generate();
        let b = SessionId::generate();

        assert_ne!(a, b);
        // 32 bytes, unpadded base64
        assert_eq!(a.as_str().len(), 43);
        assert!(a
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[tokio::test]
    async fn test_create_load_destroy_round_trip() {
        let (manager, _) = manager_with(Duration::from_secs(3600));
        let user_id = Uuid::new_v4();

        let session_id = manager.create(user_id).await.unwrap();
        assert_eq!(manager.load(&session_id).await.unwrap(), Some(user_id));

        manager.destroy(&session_id).await.unwrap();
        assert_eq!(manager.load(&session_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let (manager, _) = manager_with(Duration::from_secs(3600));
        let session_id = manager.create(Uuid::new_v4()).await.unwrap();

        manager.destroy(&session_id).await.unwrap();
        manager.destroy(&session_id).await.unwrap();
        manager
            .destroy(&SessionId::from("never-issued".to_string()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_zero_ttl_session_is_already_expired() {
        let (manager, _) = manager_with(Duration::ZERO);
        let session_id = manager.create(Uuid::new_v4()).await.unwrap();

        assert_eq!(manager.load(&session_id).await.unwrap(), None);
        assert_eq!(manager.prune_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_current_user_rehydrates_record() {
        let (manager, users) = manager_with(Duration::from_secs(3600));
        let user = add_user(&users).await;

        let session_id = manager.create(user.id).await.unwrap();
        assert_eq!(manager.current_user(&session_id).await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn test_deleted_user_is_not_authenticated() {
        let (manager, users) = manager_with(Duration::from_secs(3600));
        let user = add_user(&users).await;
        let session_id = manager.create(user.id).await.unwrap();

        users.remove(user.id).await;

        assert_eq!(manager.load(&session_id).await.unwrap(), Some(user.id));
        assert_eq!(manager.resolve_user(user.id).await.unwrap(), None);
        assert_eq!(manager.current_user(&session_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pruning_task_survives_zero_interval() {
        let (manager, _) = manager_with(Duration::ZERO);
        manager.create(Uuid::new_v4()).await.unwrap();

        let handle = spawn_session_pruning(manager.clone(), Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!handle.is_finished());
        assert_eq!(manager.prune_expired().await.unwrap(), 0);
        handle.abort();
    }
}
