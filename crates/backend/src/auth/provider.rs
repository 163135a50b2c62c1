//! Google OAuth2 authorization-code client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use shared_types::ProviderProfile;

use crate::error::AuthError;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

/// Scopes requested at login.
pub const LOGIN_SCOPES: [&str; 2] = ["profile", "email"];

/// An external identity provider speaking the authorization-code flow.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL of the provider's consent page for a login carrying `state`.
    fn authorization_url(&self, state: &str) -> String;

    /// Redeem a single-use authorization code for the user's profile.
    async fn exchange_code(&self, code: &str) -> Result<ProviderProfile, AuthError>;
}

#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub authorize: String,
    pub token: String,
    pub userinfo: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            authorize: GOOGLE_AUTH_URL.to_string(),
            token: GOOGLE_TOKEN_URL.to_string(),
            userinfo: GOOGLE_USERINFO_URL.to_string(),
        }
    }
}

pub struct GoogleProvider {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    endpoints: GoogleEndpoints,
}

impl GoogleProvider {
    /// `timeout` bounds every request made to Google.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            endpoints: GoogleEndpoints::default(),
        })
    }

    pub fn with_endpoints(mut self, endpoints: GoogleEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

#[derive(serde::Serialize)]
struct TokenRequest<'a> {
    code: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
    grant_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: Option<String>,
    name: Option<String>,
    email: Option<String>,
    picture: Option<String>,
}

impl TryFrom<GoogleUserInfo> for ProviderProfile {
    type Error = AuthError;

    fn try_from(info: GoogleUserInfo) -> Result<Self, Self::Error> {
        let provider_id = info
            .sub
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::MissingProfileField("subject id"))?;
        let email = info
            .email
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::MissingProfileField("email"))?;
        let display_name = info
            .name
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| email.clone());

        Ok(ProviderProfile {
            provider_id,
            display_name,
            email,
            image_url: info.picture.filter(|s| !s.is_empty()),
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.endpoints.authorize,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&LOGIN_SCOPES.join(" ")),
            urlencoding::encode(state),
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderProfile, AuthError> {
        let token_response = self
            .client
            .post(&self.endpoints.token)
            .form(&TokenRequest {
                code,
                client_id: &self.client_id,
                client_secret: &self.client_secret,
                redirect_uri: &self.redirect_uri,
                grant_type: "authorization_code",
            })
            .send()
            .await?;

        if !token_response.status().is_success() {
            let status = token_response.status();
            let body = token_response.text().await.unwrap_or_default();
            return Err(AuthError::TokenExchange(format!("{} - {}", status, body)));
        }

        let tokens: GoogleTokenResponse = token_response.json().await?;

        let userinfo_response = self
            .client
            .get(&self.endpoints.userinfo)
            .bearer_auth(&tokens.access_token)
            .send()
            .await?;

        if !userinfo_response.status().is_success() {
            return Err(AuthError::TokenExchange(format!(
                "userinfo request returned {}",
                userinfo_response.status()
            )));
        }

        let user_info: GoogleUserInfo = userinfo_response.json().await?;
        ProviderProfile::try_from(user_info)
    }
}
