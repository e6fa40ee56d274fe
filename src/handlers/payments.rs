use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use chrono::Utc;
use reelbox_api::{CheckoutRequest, CheckoutResponse, MessageResponse};

use crate::app::AppState;
use crate::auth::extractors::AuthClaims;
use crate::error::AppError;
use crate::response::AppResponse;

const SIGNATURE_HEADER: &str = "stripe-signature";

/// POST /api/payments/test
/// Ouvre une session de paiement pour le plan demandé
pub async fn checkout(
    claims: AuthClaims,
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<AppResponse<CheckoutResponse>, AppError> {
    let Json(payload) = payload?;
    let session = state
        .payments
        .checkout(claims.sub, &claims.email, &payload.plan)
        .await?;

    Ok(AppResponse::ok(CheckoutResponse {
        redirect_url: session.url,
    }))
}

/// POST /api/payments/webhook
/// Le corps brut est nécessaire à la vérification de signature
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<AppResponse<MessageResponse>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::validation("Missing Stripe-Signature header"))?;

    let outcome = state
        .payments
        .handle_webhook(&body, signature, Utc::now())
        .await?;
    tracing::debug!(?outcome, "Webhook handled");

    Ok(AppResponse::ok(MessageResponse::new("received")))
}
