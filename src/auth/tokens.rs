//! Access token issuance and refresh-token rotation.

use super::jwt::{JwtManager, TokenSubject};
use crate::db::models::refresh_token::NewRefreshToken;
use crate::db::models::user::User;
use crate::db::store::Store;
use crate::error::AppError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

const REFRESH_TOKEN_BYTES: usize = 64;

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Paire de jetons remise au client après une authentification réussie
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub access: AccessToken,
    pub refresh: IssuedRefreshToken,
}

#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn Store>,
    jwt: JwtManager,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(store: Arc<dyn Store>, jwt: JwtManager, refresh_token_days: i64) -> Self {
        Self {
            store,
            jwt,
            refresh_ttl: Duration::days(refresh_token_days),
        }
    }

    pub fn jwt(&self) -> &JwtManager {
        &self.jwt
    }

    /// Signe un access token reflétant les rôles et claims actuels
    pub fn issue_access_token(&self, user: &User) -> Result<AccessToken, AppError> {
        let roles = self.store.roles(user.id)?;
        let custom: BTreeMap<String, String> = self
            .store
            .claims(user.id)?
            .into_iter()
            .map(|c| (c.claim_type, c.claim_value))
            .collect();

        let token = self.jwt.generate_access_token(&TokenSubject {
            user_id: user.id,
            email: user.email.clone(),
            roles,
            custom,
        })?;

        Ok(AccessToken {
            token,
            expires_in: self.jwt.expires_in(),
        })
    }

    pub fn issue_refresh_token(&self, user_id: Uuid) -> Result<IssuedRefreshToken, AppError> {
        let row = self.store.insert_refresh_token(&NewRefreshToken {
            user_id,
            token: generate_opaque_token(),
            expires_at: Utc::now() + self.refresh_ttl,
        })?;

        Ok(IssuedRefreshToken {
            token: row.token,
            expires_at: row.expires_at,
        })
    }

    pub fn issue_session(&self, user: &User) -> Result<Session, AppError> {
        Ok(Session {
            user_id: user.id,
            access: self.issue_access_token(user)?,
            refresh: self.issue_refresh_token(user.id)?,
        })
    }

    /// Rotation: l'ancien refresh token est révoqué avant d'en émettre un nouveau.
    /// La révocation est conditionnelle, un second appel concurrent avec le
    /// même jeton échoue.
    pub fn refresh(&self, raw_token: &str) -> Result<Session, AppError> {
        if raw_token.is_empty() {
            return Err(AppError::InvalidRefreshToken);
        }

        let now = Utc::now();
        let current = self
            .store
            .find_refresh_token(raw_token)?
            .ok_or(AppError::InvalidRefreshToken)?;

        if !current.is_active(now) {
            tracing::debug!(
                token_id = %current.id,
                revoked = current.is_revoked(),
                "Rejected inactive refresh token"
            );
            return Err(AppError::InvalidRefreshToken);
        }

        if !self.store.revoke_refresh_token(current.id, now)? {
            tracing::warn!(token_id = %current.id, "Refresh token reused concurrently");
            return Err(AppError::InvalidRefreshToken);
        }

        let user = self
            .store
            .find_user(current.user_id)?
            .ok_or(AppError::InvalidRefreshToken)?;

        self.issue_session(&user)
    }

    /// Révoque le jeton s'il existe; absent ou déjà révoqué n'est pas une erreur
    pub fn logout(&self, raw_token: Option<&str>) -> Result<(), AppError> {
        let Some(raw_token) = raw_token.filter(|t| !t.is_empty()) else {
            return Ok(());
        };

        if let Some(token) = self.store.find_refresh_token(raw_token)?
            && !token.is_revoked()
        {
            self.store.revoke_refresh_token(token.id, Utc::now())?;
            tracing::debug!(user_id = %token.user_id, "Refresh token revoked on logout");
        }
        Ok(())
    }

    /// Supprime définitivement les jetons expirés
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        Ok(self.store.delete_expired_refresh_tokens(now)?)
    }
}

/// 64 octets aléatoires encodés en base64
pub fn generate_opaque_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}
