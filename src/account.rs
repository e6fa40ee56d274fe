//! The signed-in user's own account: profile and deletion.

use crate::db::models::user::Role;
use crate::db::store::Store;
use crate::error::AppError;
use crate::plans::quota::QuotaEngine;
use crate::storage::ObjectStorage;
use reelbox_api::{MediaResponse, UserProfileResponse};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    storage: Arc<dyn ObjectStorage>,
    quota: QuotaEngine,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, storage: Arc<dyn ObjectStorage>, quota: QuotaEngine) -> Self {
        Self {
            store,
            storage,
            quota,
        }
    }

    pub fn profile(&self, user_id: Uuid) -> Result<UserProfileResponse, AppError> {
        let user = self
            .store
            .find_user(user_id)?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        let storage = self.quota.storage_summary(&user)?;
        let roles = self.store.roles(user.id)?;
        let media = self
            .store
            .media_for_user(user.id)?
            .into_iter()
            .map(MediaResponse::from)
            .collect();

        Ok(UserProfileResponse {
            user: user.into(),
            roles,
            storage,
            media,
        })
    }

    /// Ajoute un rôle au compte portant cet email. `false` si le compte n'existe pas.
    /// Pris en compte au prochain access token.
    pub fn grant_role(&self, email: &str, role: Role) -> Result<bool, AppError> {
        let Some(user) = self.store.find_user_by_email(&email.trim().to_lowercase())? else {
            return Ok(false);
        };
        self.store.add_role(user.id, role)?;
        tracing::info!(user_id = %user.id, role = role.as_str(), "Role granted");
        Ok(true)
    }

    /// Les lignes partent en cascade, les objets stockés au mieux
    pub async fn delete(&self, user_id: Uuid) -> Result<(), AppError> {
        let media_ids: Vec<Uuid> = self
            .store
            .media_for_user(user_id)?
            .into_iter()
            .map(|m| m.id)
            .collect();

        if !self.store.delete_user(user_id)? {
            return Err(AppError::not_found("User not found"));
        }

        for id in &media_ids {
            if let Err(e) = self.storage.delete(&id.to_string()).await {
                tracing::warn!(%user_id, media_id = %id, error = %e, "Stored object not deleted");
            }
        }
        tracing::info!(%user_id, media = media_ids.len(), "Account deleted");
        Ok(())
    }
}
