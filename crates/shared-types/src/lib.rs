use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User struct matching database column order exactly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "diesel", derive(diesel::Queryable))]
pub struct User {
    pub id: Uuid,
    pub provider_id: String, // Google subject id, unique per user
    pub display_name: String,
    pub email: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Identity details supplied by the provider on a successful code exchange.
///
/// These are the only fields copied into a new [`User`]; later logins never
/// overwrite them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub display_name: String,
    pub email: String,
    pub image_url: Option<String>,
}

impl User {
    /// Build a user record for a profile that has not been stored yet.
    pub fn from_profile(id: Uuid, profile: ProviderProfile, created_at: DateTime<Utc>) -> Self {
        User {
            id,
            provider_id: profile.provider_id,
            display_name: profile.display_name,
            email: profile.email,
            image_url: profile.image_url,
            created_at,
        }
    }
}
