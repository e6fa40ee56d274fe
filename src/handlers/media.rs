use axum::extract::{Path, State};
use reelbox_api::{MediaResponse, MediaUrlResponse};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::extractors::AuthClaims;
use crate::error::AppError;
use crate::response::AppResponse;

/// GET /api/media
/// Médias de l'utilisateur courant, du plus récent au plus ancien
pub async fn list_media(
    claims: AuthClaims,
    State(state): State<AppState>,
) -> Result<AppResponse<Vec<MediaResponse>>, AppError> {
    Ok(AppResponse::ok(state.media.list(claims.sub)?))
}

/// GET /api/media/{id}/url
pub async fn media_url(
    _claims: AuthClaims,
    State(state): State<AppState>,
    Path(media_id): Path<Uuid>,
) -> Result<AppResponse<MediaUrlResponse>, AppError> {
    Ok(AppResponse::ok(state.media.url(media_id)?))
}

/// DELETE /api/media/{id}
pub async fn delete_media(
    claims: AuthClaims,
    State(state): State<AppState>,
    Path(media_id): Path<Uuid>,
) -> Result<AppResponse<()>, AppError> {
    state.media.delete(claims.sub, media_id).await?;
    Ok(AppResponse::no_content())
}
