//! Stripe Checkout over the REST API (form-encoded requests).

use super::{CheckoutOrder, CheckoutSession, PaymentError, PaymentProvider, WebhookEvent};
use crate::config::StripeConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const API_BASE: &str = "https://api.stripe.com/v1";
/// Tolérance de Stripe pour l'horodatage des webhooks
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Deserialize)]
struct SessionBody {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LineItems {
    data: Vec<LineItem>,
}

#[derive(Debug, Deserialize)]
struct LineItem {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(rename = "type")]
    kind: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: EventObject,
}

#[derive(Debug, Deserialize)]
struct EventObject {
    id: String,
    client_reference_id: Option<String>,
}

#[derive(Clone)]
pub struct StripeClient {
    config: StripeConfig,
    http: reqwest::Client,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    async fn read<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PaymentError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(|b| b.error.message)
            .unwrap_or(body);
        Err(PaymentError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_checkout_session(
        &self,
        order: &CheckoutOrder,
    ) -> Result<CheckoutSession, PaymentError> {
        let user_id = order.user_id.to_string();
        let amount = order.amount_cents.to_string();
        let form = [
            ("mode", "payment"),
            ("client_reference_id", user_id.as_str()),
            ("customer_email", order.customer_email.as_str()),
            ("success_url", self.config.success_url.as_str()),
            ("cancel_url", self.config.cancel_url.as_str()),
            ("line_items[0][quantity]", "1"),
            ("line_items[0][price_data][currency]", self.config.currency.as_str()),
            ("line_items[0][price_data][unit_amount]", amount.as_str()),
            ("line_items[0][price_data][product_data][name]", order.plan_name.as_str()),
            ("metadata[plan]", order.plan_name.as_str()),
        ];

        let response = self
            .http
            .post(format!("{API_BASE}/checkout/sessions"))
            .bearer_auth(&self.config.secret_key)
            .form(&form)
            .send()
            .await?;
        let session: SessionBody = Self::read(response).await?;

        let url = session.url.ok_or_else(|| PaymentError::Api {
            status: 200,
            message: "Checkout session has no URL".to_string(),
        })?;
        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    fn parse_webhook(
        &self,
        payload: &str,
        signature_header: &str,
        now: DateTime<Utc>,
    ) -> Result<WebhookEvent, PaymentError> {
        verify_signature(&self.config.webhook_secret, payload, signature_header, now)?;

        let event: Event = serde_json::from_str(payload)
            .map_err(|e| PaymentError::MalformedEvent(e.to_string()))?;

        Ok(match event.kind.as_str() {
            "checkout.session.completed" => WebhookEvent::CheckoutCompleted {
                session_id: event.data.object.id,
                client_reference_id: event.data.object.client_reference_id,
            },
            "payment_intent.payment_failed" => WebhookEvent::PaymentFailed {
                payment_intent_id: event.data.object.id,
            },
            _ => WebhookEvent::Other(event.kind),
        })
    }

    async fn first_line_item_description(
        &self,
        session_id: &str,
    ) -> Result<Option<String>, PaymentError> {
        let response = self
            .http
            .get(format!("{API_BASE}/checkout/sessions/{session_id}/line_items"))
            .bearer_auth(&self.config.secret_key)
            .query(&[("limit", "1")])
            .send()
            .await?;
        let items: LineItems = Self::read(response).await?;

        Ok(items.data.into_iter().next().and_then(|item| item.description))
    }
}

/// Vérifie un en-tête `Stripe-Signature` (`t=...,v1=...`)
pub fn verify_signature(
    secret: &str,
    payload: &str,
    header: &str,
    now: DateTime<Utc>,
) -> Result<(), PaymentError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(PaymentError::InvalidSignature)?;
    let signed_payload = format!("{timestamp}.{payload}");

    // Comparaison en temps constant via verify_slice
    let valid = signatures.iter().any(|candidate| {
        let Ok(expected) = hex::decode(candidate) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(signed_payload.as_bytes());
        mac.verify_slice(&expected).is_ok()
    });
    if !valid {
        return Err(PaymentError::InvalidSignature);
    }

    if (now.timestamp() - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(PaymentError::StaleTimestamp);
    }

    Ok(())
}
