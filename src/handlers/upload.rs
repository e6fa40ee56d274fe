use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use chrono::Utc;
use reelbox_api::{MediaResponse, UploadCompleteRequest, UploadUrlQuery, UploadUrlResponse};

use crate::app::AppState;
use crate::auth::extractors::AuthClaims;
use crate::db::models::user::CAN_UPLOAD_VIDEOS;
use crate::error::AppError;
use crate::response::AppResponse;

/// GET /api/upload/url?fileName=&contentType=&fileSize=
/// Admission de l'upload et URL PUT présignée
pub async fn upload_url(
    claims: AuthClaims,
    State(state): State<AppState>,
    query: Result<Query<UploadUrlQuery>, QueryRejection>,
) -> Result<AppResponse<UploadUrlResponse>, AppError> {
    claims.require_claim(CAN_UPLOAD_VIDEOS, "true")?;
    let Query(query) = query?;

    let ticket = state.media.upload_url(claims.sub, &query, Utc::now())?;
    Ok(AppResponse::ok(ticket))
}

/// POST /api/upload/complete
pub async fn upload_complete(
    claims: AuthClaims,
    State(state): State<AppState>,
    payload: Result<Json<UploadCompleteRequest>, JsonRejection>,
) -> Result<AppResponse<MediaResponse>, AppError> {
    claims.require_claim(CAN_UPLOAD_VIDEOS, "true")?;
    let Json(payload) = payload?;

    let media = state.media.complete(claims.sub, payload, Utc::now())?;
    Ok(AppResponse::created(media))
}
