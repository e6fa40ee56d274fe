use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub email_confirmed: bool,
    pub created_at: DateTime<Utc>,
}

/// Body returned by register, login and refresh.
/// The refresh token itself only ever travels in the HTTP-only cookie.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UploadUrlResponse {
    pub media_id: Uuid,
    pub url: String,
    pub expires_in: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MediaResponse {
    pub id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub file_size: i64,
    pub uploaded_at: DateTime<Utc>,
    pub status: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MediaUrlResponse {
    pub id: Uuid,
    pub url: String,
    pub content_type: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PlanResponse {
    pub id: i32,
    pub name: String,
    pub storage_limit_bytes: i64,
    pub price_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StorageSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    pub used_memory_bytes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchased_memory_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_expiration: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserProfileResponse {
    pub user: UserResponse,
    pub roles: Vec<String>,
    pub storage: StorageSummary,
    pub media: Vec<MediaResponse>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CheckoutResponse {
    pub redirect_url: String,
}
