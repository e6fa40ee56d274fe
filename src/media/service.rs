use crate::db::models::media::{NewMedia, STATUS_UPLOADED};
use crate::db::store::Store;
use crate::error::AppError;
use crate::plans::quota::QuotaEngine;
use crate::storage::{ObjectStorage, PresignVerb};
use chrono::{DateTime, Utc};
use reelbox_api::{
    MediaResponse, MediaUrlResponse, UploadCompleteRequest, UploadUrlQuery, UploadUrlResponse,
};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/png", "video/mp4", "video/webm"];
const MAX_FILE_NAME_LEN: usize = 255;

/// Métadonnées d'upload déclarées par le client
pub fn validate_upload(
    file_name: &str,
    content_type: &str,
    file_size: i64,
) -> Result<(), AppError> {
    if file_name.trim().is_empty() {
        return Err(AppError::validation("FileName is required."));
    }
    if file_name.len() > MAX_FILE_NAME_LEN {
        return Err(AppError::validation("FileName is too long."));
    }
    if file_size <= 0 {
        return Err(AppError::validation("Invalid file size."));
    }
    if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
        return Err(AppError::validation("Unsupported content type"));
    }
    Ok(())
}

#[derive(Clone)]
pub struct MediaService {
    store: Arc<dyn Store>,
    storage: Arc<dyn ObjectStorage>,
    quota: QuotaEngine,
    presign_ttl: Duration,
}

impl MediaService {
    pub fn new(
        store: Arc<dyn Store>,
        storage: Arc<dyn ObjectStorage>,
        quota: QuotaEngine,
        presign_ttl: Duration,
    ) -> Self {
        Self {
            store,
            storage,
            quota,
            presign_ttl,
        }
    }

    fn expires_in(&self) -> i64 {
        i64::try_from(self.presign_ttl.as_secs()).unwrap_or(i64::MAX)
    }

    /// Admission puis URL PUT présignée; la clé d'objet est l'id du média
    pub fn upload_url(
        &self,
        user_id: Uuid,
        query: &UploadUrlQuery,
        now: DateTime<Utc>,
    ) -> Result<UploadUrlResponse, AppError> {
        validate_upload(&query.file_name, &query.content_type, query.file_size)?;
        self.quota
            .can_upload(user_id, query.file_size, now)?
            .into_result()?;

        let media_id = Uuid::new_v4();
        let url = self
            .storage
            .presign(&media_id.to_string(), PresignVerb::Put, self.presign_ttl)?;

        tracing::debug!(%user_id, %media_id, size = query.file_size, "Upload URL issued");
        Ok(UploadUrlResponse {
            media_id,
            url,
            expires_in: self.expires_in(),
        })
    }

    /// Réserve le quota de façon atomique puis enregistre le média.
    /// La réservation est rendue si l'insertion échoue.
    pub fn complete(
        &self,
        user_id: Uuid,
        request: UploadCompleteRequest,
        now: DateTime<Utc>,
    ) -> Result<MediaResponse, AppError> {
        validate_upload(&request.file_name, &request.content_type, request.file_size)?;
        if self.store.find_media(request.media_id)?.is_some() {
            return Err(AppError::duplicate("Media already registered"));
        }

        self.quota
            .can_upload(user_id, request.file_size, now)?
            .into_result()?;
        self.quota.increase_used_memory(user_id, request.file_size)?;

        let inserted = self.store.insert_media(&NewMedia {
            id: request.media_id,
            user_id,
            file_name: request.file_name.trim().to_string(),
            content_type: request.content_type,
            file_size: request.file_size,
            status: STATUS_UPLOADED.to_string(),
        });

        match inserted {
            Ok(media) => {
                tracing::info!(
                    %user_id,
                    media_id = %media.id,
                    size = media.file_size,
                    "Upload completed"
                );
                Ok(media.into())
            }
            Err(e) => {
                if let Err(undo) = self.quota.decrease_used_memory(user_id, request.file_size) {
                    tracing::error!(%user_id, error = %undo, "Quota reservation not released");
                }
                Err(e.into())
            }
        }
    }

    pub fn list(&self, user_id: Uuid) -> Result<Vec<MediaResponse>, AppError> {
        Ok(self
            .store
            .media_for_user(user_id)?
            .into_iter()
            .map(MediaResponse::from)
            .collect())
    }

    /// URL GET présignée, accessible à tout utilisateur authentifié
    pub fn url(&self, media_id: Uuid) -> Result<MediaUrlResponse, AppError> {
        let media = self
            .store
            .find_media(media_id)?
            .ok_or_else(|| AppError::not_found("Media not found"))?;
        let url = self
            .storage
            .presign(&media.id.to_string(), PresignVerb::Get, self.presign_ttl)?;

        Ok(MediaUrlResponse {
            id: media.id,
            url,
            content_type: media.content_type,
        })
    }

    pub async fn delete(&self, user_id: Uuid, media_id: Uuid) -> Result<(), AppError> {
        let media = self
            .store
            .find_media(media_id)?
            .ok_or_else(|| AppError::not_found("Media not found"))?;
        if media.user_id != user_id {
            return Err(AppError::forbidden("You do not own this media"));
        }

        if !self.store.delete_media(media.id)? {
            return Err(AppError::not_found("Media not found"));
        }
        self.quota.decrease_used_memory(user_id, media.file_size)?;

        if let Err(e) = self.storage.delete(&media.id.to_string()).await {
            tracing::warn!(%media_id, error = %e, "Stored object not deleted");
        }
        tracing::info!(%user_id, %media_id, "Media deleted");
        Ok(())
    }
}
