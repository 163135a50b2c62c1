// Database models for Diesel
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use shared_types::ProviderProfile;
use uuid::Uuid;

/// Insertable struct for first-time logins; `id` and `created_at` are
/// assigned by the database.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser<'a> {
    pub provider_id: &'a str,
    pub display_name: &'a str,
    pub email: &'a str,
    pub image_url: Option<&'a str>,
}

impl<'a> From<&'a ProviderProfile> for NewUser<'a> {
    fn from(profile: &'a ProviderProfile) -> Self {
        NewUser {
            provider_id: &profile.provider_id,
            display_name: &profile.display_name,
            email: &profile.email,
            image_url: profile.image_url.as_deref(),
        }
    }
}

/// Insertable struct for a freshly issued session
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::sessions)]
pub struct NewSession<'a> {
    pub id: &'a str,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}
