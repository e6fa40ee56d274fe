use super::retry::RetryConfig;
use super::{EmailError, EmailMessage, EmailSender};
use async_trait::async_trait;
use serde::Serialize;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Debug, Serialize)]
struct ResendPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Client de l'API HTTP Resend, avec réessais bornés
#[derive(Clone)]
pub struct ResendClient {
    http: reqwest::Client,
    api_key: String,
    from: String,
    retry: RetryConfig,
}

impl ResendClient {
    pub fn new(api_key: String, from: String, retry: RetryConfig) -> Result<Self, EmailError> {
        let http = reqwest::Client::builder().timeout(retry.timeout()).build()?;
        Ok(Self {
            http,
            api_key,
            from,
            retry,
        })
    }

    async fn send_once(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let response = self
            .http
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&payload(&self.from, message))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(EmailError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

fn payload<'a>(from: &'a str, message: &'a EmailMessage) -> ResendPayload<'a> {
    ResendPayload {
        from,
        to: [message.to.as_str()],
        subject: &message.subject,
        html: &message.html,
    }
}

#[async_trait]
impl EmailSender for ResendClient {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let mut attempts = 0;
        loop {
            match self.send_once(message).await {
                Ok(()) => {
                    tracing::info!(
                        to = %message.to,
                        subject = %message.subject,
                        "Email sent via Resend"
                    );
                    return Ok(());
                }
                Err(err) => {
                    attempts += 1;
                    if !err.is_retryable() || !self.retry.should_retry(attempts) {
                        tracing::error!(
                            to = %message.to,
                            attempts,
                            error = %err,
                            "Email delivery failed"
                        );
                        return Err(err);
                    }
                    let delay = self.retry.calculate_delay(attempts - 1);
                    tracing::warn!(
                        to = %message.to,
                        attempts,
                        ?delay,
                        error = %err,
                        "Email delivery failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_matches_resend_schema() {
        let message = EmailMessage {
            to: "user@example.com".to_string(),
            subject: "Hi".to_string(),
            html: "<p>Hi</p>".to_string(),
        };

        let json =
            serde_json::to_value(payload("ReelBox <no-reply@reelbox.io>", &message)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "from": "ReelBox <no-reply@reelbox.io>",
                "to": ["user@example.com"],
                "subject": "Hi",
                "html": "<p>Hi</p>",
            })
        );
    }

    #[test]
    fn client_errors_are_not_retried() {
        let rejected = EmailError::Rejected {
            status: 422,
            body: "invalid from".to_string(),
        };
        let throttled = EmailError::Rejected {
            status: 429,
            body: String::new(),
        };

        assert!(!rejected.is_retryable());
        assert!(throttled.is_retryable());
    }
}
