//! Storage plan purchases through a hosted checkout.

pub mod stripe;

use crate::error::AppError;
use crate::plans::quota::QuotaEngine;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Invalid webhook signature")]
    InvalidSignature,
    #[error("Webhook timestamp outside tolerance")]
    StaleTimestamp,
    #[error("Malformed webhook event: {0}")]
    MalformedEvent(String),
    #[error("Payment request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Payment provider returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// Achat d'un plan, une seule ligne de commande
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutOrder {
    pub user_id: Uuid,
    pub customer_email: String,
    pub plan_name: String,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    CheckoutCompleted {
        session_id: String,
        client_reference_id: Option<String>,
    },
    PaymentFailed {
        payment_intent_id: String,
    },
    Other(String),
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_checkout_session(
        &self,
        order: &CheckoutOrder,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Verifies the signature header then decodes the event.
    fn parse_webhook(
        &self,
        payload: &str,
        signature_header: &str,
        now: DateTime<Utc>,
    ) -> Result<WebhookEvent, PaymentError>;

    /// Description of the first line item, i.e. the purchased plan name.
    async fn first_line_item_description(
        &self,
        session_id: &str,
    ) -> Result<Option<String>, PaymentError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    PlanAssigned { user_id: Uuid, plan: String },
    PaymentFailed,
    Ignored,
}

#[derive(Clone)]
pub struct PaymentService {
    provider: Arc<dyn PaymentProvider>,
    quota: QuotaEngine,
}

impl PaymentService {
    pub fn new(provider: Arc<dyn PaymentProvider>, quota: QuotaEngine) -> Self {
        Self { provider, quota }
    }

    pub async fn checkout(
        &self,
        user_id: Uuid,
        email: &str,
        plan_name: &str,
    ) -> Result<CheckoutSession, AppError> {
        let plan = self.quota.find_plan(plan_name)?;
        if plan.is_free() || plan.price_cents <= 0 {
            return Err(AppError::validation("This plan cannot be purchased"));
        }

        let order = CheckoutOrder {
            user_id,
            customer_email: email.to_string(),
            plan_name: plan.name,
            amount_cents: plan.price_cents,
        };
        let session = self.provider.create_checkout_session(&order).await?;

        tracing::info!(
            %user_id,
            plan = %order.plan_name,
            session_id = %session.id,
            "Checkout session created"
        );
        Ok(session)
    }

    /// Erreurs de stockage propagées pour que le fournisseur réessaie,
    /// données incohérentes acquittées et journalisées.
    pub async fn handle_webhook(
        &self,
        payload: &str,
        signature_header: &str,
        now: DateTime<Utc>,
    ) -> Result<WebhookOutcome, AppError> {
        let event = self
            .provider
            .parse_webhook(payload, signature_header, now)
            .inspect_err(|e| tracing::warn!(error = %e, "Webhook rejected"))?;

        match event {
            WebhookEvent::CheckoutCompleted {
                session_id,
                client_reference_id,
            } => {
                let Some(user_id) = client_reference_id
                    .as_deref()
                    .and_then(|id| Uuid::parse_str(id).ok())
                else {
                    tracing::warn!(
                        %session_id,
                        "Checkout completed without a valid client reference"
                    );
                    return Ok(WebhookOutcome::Ignored);
                };

                let Some(plan) = self
                    .provider
                    .first_line_item_description(&session_id)
                    .await?
                else {
                    tracing::warn!(%session_id, "No line items found for session");
                    return Ok(WebhookOutcome::Ignored);
                };

                match self.quota.assign_plan(user_id, &plan, now) {
                    Ok(_) => {
                        tracing::info!(%user_id, %plan, %session_id, "Payment succeeded");
                        Ok(WebhookOutcome::PlanAssigned { user_id, plan })
                    }
                    Err(AppError::NotFound(what)) => {
                        tracing::warn!(%user_id, %session_id, %what, "Paid plan not applied");
                        Ok(WebhookOutcome::Ignored)
                    }
                    Err(e) => Err(e),
                }
            }
            WebhookEvent::PaymentFailed { payment_intent_id } => {
                tracing::warn!(%payment_intent_id, "Payment failed");
                Ok(WebhookOutcome::PaymentFailed)
            }
            WebhookEvent::Other(kind) => {
                tracing::debug!(%kind, "Webhook event ignored");
                Ok(WebhookOutcome::Ignored)
            }
        }
    }
}
