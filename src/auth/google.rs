//! Google OAuth 2 authorization-code flow.

use super::external::{ExternalAuthProvider, ExternalIdentity, OAuthError};
use crate::config::GoogleConfig;
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const PROVIDER: &str = "google";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    error_description: Option<String>,
}

#[derive(Clone)]
pub struct GoogleProvider {
    config: GoogleConfig,
    http: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    async fn fail(response: reqwest::Response) -> OAuthError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| match e.error_description {
                Some(description) => format!("{}: {description}", e.error),
                None => e.error,
            })
            .unwrap_or(body);
        OAuthError::Provider(format!("{status}: {detail}"))
    }
}

impl From<UserInfo> for ExternalIdentity {
    fn from(info: UserInfo) -> Self {
        ExternalIdentity {
            provider: PROVIDER.to_string(),
            provider_key: info.sub,
            // Un email non vérifié ne sert pas à lier un compte
            email: info.email.filter(|_| info.email_verified != Some(false)),
            display_name: info.name,
        }
    }
}

#[async_trait]
impl ExternalAuthProvider for GoogleProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn authorization_url(&self, state: &str) -> Result<String, OAuthError> {
        let url = Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", "openid email profile"),
                ("state", state),
                ("prompt", "select_account"),
            ],
        )
        .map_err(|e| OAuthError::Provider(e.to_string()))?;
        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, OAuthError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::fail(response).await);
        }
        let token: TokenResponse = response.json().await?;

        let response = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::fail(response).await);
        }
        let info: UserInfo = response.json().await?;

        tracing::debug!(provider_key = %info.sub, "Google identity resolved");
        Ok(info.into())
    }
}
