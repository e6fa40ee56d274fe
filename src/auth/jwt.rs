use crate::config::JwtConfig;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Audience des jetons `state` du flux OAuth, distincte de celle des access tokens
const OAUTH_STATE_AUDIENCE: &str = "reelbox-oauth-state";
const OAUTH_STATE_MINUTES: i64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Token generation failed: {0}")]
    GenerationFailed(jsonwebtoken::errors::Error),
    #[error("Token verification failed: {0}")]
    VerificationFailed(jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Claims applicatifs, par exemple `CanUploadVideos`
    #[serde(flatten)]
    pub custom: BTreeMap<String, String>,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

/// Ce qu'un access token affirme sur son porteur
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
    pub custom: BTreeMap<String, String>,
}

/// Contenu signé du paramètre `state` pendant un aller-retour OAuth
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OAuthState {
    pub provider: String,
    pub return_url: String,
    pub nonce: Uuid,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    access_token_minutes: i64,
}

impl JwtManager {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_token_minutes: config.access_token_minutes,
        }
    }

    /// Durée de vie d'un access token, en secondes
    pub fn expires_in(&self) -> i64 {
        self.access_token_minutes * 60
    }

    /// Génère un access token avec la durée configurée
    pub fn generate_access_token(&self, subject: &TokenSubject) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.user_id,
            email: subject.email.clone(),
            roles: subject.roles.clone(),
            custom: subject.custom.clone(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: (now + Duration::minutes(self.access_token_minutes)).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(JwtError::GenerationFailed)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(JwtError::VerificationFailed)
    }

    pub fn sign_oauth_state(&self, provider: &str, return_url: &str) -> Result<String, JwtError> {
        let now = Utc::now();
        let state = OAuthState {
            provider: provider.to_string(),
            return_url: return_url.to_string(),
            nonce: Uuid::new_v4(),
            aud: OAUTH_STATE_AUDIENCE.to_string(),
            exp: (now + Duration::minutes(OAUTH_STATE_MINUTES)).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &state, &self.encoding_key)
            .map_err(JwtError::GenerationFailed)
    }

    pub fn verify_oauth_state(&self, token: &str) -> Result<OAuthState, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[OAUTH_STATE_AUDIENCE]);

        decode::<OAuthState>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(JwtError::VerificationFailed)
    }
}
