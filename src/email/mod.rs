//! Outbound email.

pub mod resend;
pub mod retry;

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Email request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Email provider returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl EmailError {
    /// Erreurs 4xx hors 429: inutile de réessayer
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Utilisé quand aucune clé d'API n'est configurée
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlySender;

#[async_trait]
impl EmailSender for LogOnlySender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        tracing::warn!(
            to = %message.to,
            subject = %message.subject,
            "Email provider not configured, email not sent"
        );
        Ok(())
    }
}
