use axum::extract::State;
use reelbox_api::UserProfileResponse;

use crate::app::AppState;
use crate::auth::cookies::set_cookie_headers;
use crate::auth::extractors::AuthClaims;
use crate::error::AppError;
use crate::response::AppResponse;

/// GET /api/users/me
/// Profil, plan, consommation et médias de l'utilisateur courant
pub async fn get_current_user(
    claims: AuthClaims,
    State(state): State<AppState>,
) -> Result<AppResponse<UserProfileResponse>, AppError> {
    Ok(AppResponse::ok(state.accounts.profile(claims.sub)?))
}

/// DELETE /api/users/me
/// Supprime le compte courant
pub async fn delete_current_user(
    claims: AuthClaims,
    State(state): State<AppState>,
) -> Result<AppResponse<()>, AppError> {
    state.accounts.delete(claims.sub).await?;
    Ok(AppResponse::no_content()
        .with_headers(set_cookie_headers(state.cookies.clear_refresh_cookie())))
}
