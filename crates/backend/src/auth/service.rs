//! Login orchestration: provider handshake, user reconciliation, sessions.

use std::sync::Arc;

use shared_types::{ProviderProfile, User};

use crate::error::{AuthError, StoreError};
use crate::repository::UserStore;

use super::provider::IdentityProvider;
use super::session::{random_token, SessionId, SessionManager};

/// Bytes of randomness in the OAuth `state` parameter.
const STATE_BYTES: usize = 16;

/// Where to send the browser to start a login, and the `state` value the
/// callback must echo back.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

pub struct Authenticator {
    provider: Arc<dyn IdentityProvider>,
    users: Arc<dyn UserStore>,
    sessions: SessionManager,
}

impl Authenticator {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        users: Arc<dyn UserStore>,
        sessions: SessionManager,
    ) -> Self {
        Self {
            provider,
            users,
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Build the provider redirect for a new login. Has no side effects.
    pub fn begin_authentication(&self) -> AuthorizationRequest {
        let state = random_token(STATE_BYTES);
        AuthorizationRequest {
            url: self.provider.authorization_url(&state),
            state,
        }
    }

    /// Redeem an authorization code and return the matching user, creating
    /// it on first login.
    pub async fn complete_authentication(&self, code: &str) -> Result<User, AuthError> {
        let profile = self.provider.exchange_code(code).await?;
        let user = self.reconcile(&profile).await?;
        Ok(user)
    }

    /// Find the user for `profile`, or store a new one. Existing records are
    /// returned untouched.
    async fn reconcile(&self, profile: &ProviderProfile) -> Result<User, StoreError> {
        if let Some(user) = self.users.find_by_provider_id(&profile.provider_id).await? {
            tracing::debug!("Returning user {} for {}", user.id, user.provider_id);
            return Ok(user);
        }

        // A concurrent callback may have inserted the same provider id since
        // the lookup; insert_if_absent hands back that row instead.
        let (user, created) = self.users.insert_if_absent(profile).await?;
        if created {
            tracing::info!("Created user {} for {}", user.id, user.email);
        }

        Ok(user)
    }

    /// Start a session for `user`; the returned id goes into the cookie.
    pub async fn establish_session(&self, user: &User) -> Result<SessionId, StoreError> {
        self.sessions.create(user.id).await
    }

    /// End a session. Ending an unknown session succeeds.
    pub async fn end_session(&self, session_id: &SessionId) -> Result<(), StoreError> {
        self.sessions.destroy(session_id).await
    }
}
