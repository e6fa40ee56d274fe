use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -------- AUTH --------
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterRequest {
    pub email: String,
    /// Defaults to the email when omitted.
    #[serde(default)]
    pub username: Option<String>,
    pub password: String, // Plain text
    pub password_confirm: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String, // Plain text
}

/// Query of `GET /api/auth/external-login`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExternalLoginQuery {
    pub provider: String,
    #[serde(rename = "returnUrl")]
    pub return_url: String,
}

/// Query the OAuth provider appends when redirecting back to us.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ExternalLoginCallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, rename = "returnUrl")]
    pub return_url: Option<String>,
}

// -------- UPLOAD --------
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlQuery {
    pub file_name: String,
    pub content_type: String,
    pub file_size: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UploadCompleteRequest {
    pub media_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub file_size: i64,
}

// -------- PAYMENTS --------
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CheckoutRequest {
    pub plan: String,
}
