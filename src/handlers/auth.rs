// src/handlers/auth.rs

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use reelbox_api::{
    AuthResponse, ExternalLoginCallbackQuery, ExternalLoginQuery, LoginRequest, MessageResponse,
    RegisterRequest, UserResponse,
};

use crate::app::AppState;
use crate::auth::cookies::{SameSite, refresh_token_from, set_cookie_headers};
use crate::auth::tokens::Session;
use crate::db::models::user::User;
use crate::error::AppError;
use crate::response::AppResponse;

fn auth_body(session: &Session, user: Option<User>) -> AuthResponse {
    AuthResponse {
        access_token: session.access.token.clone(),
        token_type: "Bearer".to_string(),
        expires_in: session.access.expires_in,
        user: user.map(UserResponse::from),
    }
}

/// Corps JSON + cookie HTTP-only portant le refresh token
fn with_refresh_cookie(
    state: &AppState,
    response: AppResponse<AuthResponse>,
    session: &Session,
) -> Result<AppResponse<AuthResponse>, AppError> {
    let cookie = state.cookies.refresh_cookie(
        &session.refresh.token,
        session.refresh.expires_at,
        SameSite::Strict,
    )?;
    Ok(response.with_headers(set_cookie_headers(cookie)))
}

/// POST /api/auth/register
/// Inscription d'un nouvel utilisateur, connecté dans la foulée
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<AppResponse<AuthResponse>, AppError> {
    let Json(payload) = payload?;
    let (user, session) = state.auth.register(payload)?;

    let body = auth_body(&session, Some(user));
    with_refresh_cookie(&state, AppResponse::created(body), &session)
}

/// POST /api/auth/login
/// Connexion d'un utilisateur
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<AppResponse<AuthResponse>, AppError> {
    let Json(payload) = payload?;
    let (user, session) = state.auth.login(&payload)?;

    let body = auth_body(&session, Some(user));
    with_refresh_cookie(&state, AppResponse::ok(body), &session)
}

/// POST /api/auth/refresh
/// Rotation du refresh token lu dans le cookie
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<AppResponse<AuthResponse>, AppError> {
    let raw = refresh_token_from(&headers).ok_or(AppError::InvalidRefreshToken)?;
    let session = state.tokens.refresh(&raw)?;
    tracing::debug!(user_id = %session.user_id, "Refresh token rotated");

    let body = auth_body(&session, None);
    with_refresh_cookie(&state, AppResponse::ok(body), &session)
}

/// POST /api/auth/logout
/// Révoque le refresh token s'il existe; le cookie est toujours effacé
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResponse<MessageResponse> {
    let raw = refresh_token_from(&headers);
    if let Err(e) = state.tokens.logout(raw.as_deref()) {
        tracing::error!(error = %e, "Refresh token not revoked on logout");
    }

    AppResponse::ok(MessageResponse::new("Logged out successfully"))
        .with_headers(set_cookie_headers(state.cookies.clear_refresh_cookie()))
}

/// GET /api/auth/external-login?provider=&returnUrl=
/// Redirige vers le fournisseur OAuth
pub async fn external_login(
    State(state): State<AppState>,
    query: Result<Query<ExternalLoginQuery>, QueryRejection>,
) -> Result<AppResponse<()>, AppError> {
    let Query(query) = query?;
    let location = state.external.begin(&query.provider, &query.return_url)?;
    AppResponse::redirect(&location)
}

/// GET /api/auth/external-login-callback
/// Retour du fournisseur: redirige vers le front avec l'access token ou un code d'erreur
pub async fn external_login_callback(
    State(state): State<AppState>,
    Query(query): Query<ExternalLoginCallbackQuery>,
) -> Result<AppResponse<()>, AppError> {
    match state.external.complete(&query).await {
        Ok(success) => {
            tracing::debug!(
                user_id = %success.user.id,
                outcome = ?success.outcome,
                "External login callback succeeded"
            );
            // Posé pendant une redirection cross-site
            let cookie = state.cookies.refresh_cookie(
                &success.session.refresh.token,
                success.session.refresh.expires_at,
                SameSite::None,
            )?;
            Ok(AppResponse::redirect(&success.redirect_url)?
                .with_headers(set_cookie_headers(cookie)))
        }
        Err(failure) => {
            tracing::info!(code = failure.error.code(), "External login callback failed");
            AppResponse::redirect(&failure.redirect_url)
        }
    }
}
