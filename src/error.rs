// src/error.rs

use crate::plans::quota::UploadDenial;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use reelbox_api::ErrorResponse;

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    // === Erreurs Repository ===
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    Duplicate(String),
    #[error("Database error: {0}")]
    Database(String),

    // === Erreurs d'Authentification ===
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Email already exists")]
    UserAlreadyExists,
    #[error("Invalid refresh token")]
    InvalidRefreshToken,
    #[error("Invalid access token")]
    InvalidAccessToken,
    #[error("Invalid email format")]
    InvalidEmail,
    #[error("Password too weak: {0}")]
    WeakPassword(String),
    #[error("Passwords do not match")]
    PasswordMismatch,

    // === Erreurs d'autorisation ===
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Blocked by CSRF protection")]
    CsrfRejected,
    #[error("Upload rejected: {0}")]
    QuotaExceeded(UploadDenial),

    // === Erreurs de Validation ===
    #[error("Validation error: {0}")]
    Validation(String),

    // === Services externes ===
    #[error("Upstream service error: {0}")]
    Upstream(String),

    // === Erreurs internes ===
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, internal_detail) = self.get_error_info();

        if let Some(ref detail) = internal_detail {
            tracing::error!(error_code, %status, detail, "Request failed");
        }

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details: None,
        });

        (status, body).into_response()
    }
}

impl AppError {
    /// Récupère les informations d'erreur formatées pour la réponse HTTP
    fn get_error_info(&self) -> (StatusCode, &'static str, String, Option<String>) {
        match self {
            // 404 Not Found
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), None),

            // 409 Conflict
            AppError::Duplicate(msg) => {
                (StatusCode::CONFLICT, "DUPLICATE_ENTRY", msg.clone(), None)
            }
            AppError::UserAlreadyExists => (
                StatusCode::CONFLICT,
                "USER_EXISTS",
                "Email already exists".to_string(),
                None,
            ),

            // 401 Unauthorized
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid email or password".to_string(),
                None,
            ),
            AppError::InvalidRefreshToken => (
                StatusCode::UNAUTHORIZED,
                "INVALID_REFRESH_TOKEN",
                "Refresh token is missing, expired or revoked".to_string(),
                None,
            ),
            AppError::InvalidAccessToken => (
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                "Access token is missing or invalid".to_string(),
                None,
            ),
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone(), None)
            }

            // 403 Forbidden
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone(), None),
            AppError::CsrfRejected => (
                StatusCode::FORBIDDEN,
                "CSRF_REJECTED",
                "Blocked by CSRF protection. Invalid request origin.".to_string(),
                None,
            ),
            AppError::QuotaExceeded(denial) => (
                StatusCode::FORBIDDEN,
                denial.code(),
                denial.to_string(),
                None,
            ),

            // 400 Bad Request
            AppError::InvalidEmail => (
                StatusCode::BAD_REQUEST,
                "INVALID_EMAIL",
                "Invalid email format".to_string(),
                None,
            ),
            AppError::WeakPassword(msg) => {
                (StatusCode::BAD_REQUEST, "WEAK_PASSWORD", msg.clone(), None)
            }
            AppError::PasswordMismatch => (
                StatusCode::BAD_REQUEST,
                "PASSWORD_MISMATCH",
                "Passwords do not match".to_string(),
                None,
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                None,
            ),

            // 502 Bad Gateway
            AppError::Upstream(msg) => (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                "An external service failed, please retry later".to_string(),
                Some(msg.clone()),
            ),

            // 500 Internal Server Error
            AppError::Database(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "An error occurred with the database".to_string(),
                Some(msg.clone()),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred".to_string(),
                Some(msg.clone()),
            ),
        }
    }

    // === Constructeurs helpers ===
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn duplicate(msg: impl Into<String>) -> Self {
        AppError::Duplicate(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        AppError::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        AppError::Upstream(msg.into())
    }

    /// Code court exposé au client, réutilisé dans les redirections OAuth
    pub fn code(&self) -> &'static str {
        self.get_error_info().1
    }
}

// === Conversions automatiques depuis d'autres types d'erreurs ===

impl From<crate::db::error::RepositoryError> for AppError {
    fn from(err: crate::db::error::RepositoryError) -> Self {
        use crate::db::error::RepositoryError;

        match err {
            RepositoryError::NotFound(msg) => AppError::not_found(msg),
            RepositoryError::UniqueViolation(msg) => AppError::duplicate(msg),
            RepositoryError::PoolError(msg)
            | RepositoryError::ForeignKeyViolation(msg)
            | RepositoryError::DatabaseError(msg) => AppError::database(msg),
        }
    }
}

impl From<crate::auth::jwt::JwtError> for AppError {
    fn from(err: crate::auth::jwt::JwtError) -> Self {
        match err {
            crate::auth::jwt::JwtError::GenerationFailed(e) => {
                AppError::internal(format!("Token generation failed: {e}"))
            }
            crate::auth::jwt::JwtError::VerificationFailed(_) => AppError::InvalidAccessToken,
        }
    }
}

impl From<crate::auth::password::PasswordError> for AppError {
    fn from(err: crate::auth::password::PasswordError) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<crate::storage::StorageError> for AppError {
    fn from(err: crate::storage::StorageError) -> Self {
        AppError::upstream(err.to_string())
    }
}

impl From<crate::payments::PaymentError> for AppError {
    fn from(err: crate::payments::PaymentError) -> Self {
        use crate::payments::PaymentError;

        match err {
            PaymentError::InvalidSignature | PaymentError::StaleTimestamp => {
                AppError::validation(err.to_string())
            }
            PaymentError::MalformedEvent(msg) => AppError::validation(msg),
            PaymentError::Http(_) | PaymentError::Api { .. } => AppError::upstream(err.to_string()),
        }
    }
}

impl From<crate::auth::external::OAuthError> for AppError {
    fn from(err: crate::auth::external::OAuthError) -> Self {
        use crate::auth::external::OAuthError;

        match err {
            OAuthError::MissingCallbackInfo(_) | OAuthError::MissingEmail => {
                AppError::unauthorized(err.to_string())
            }
            OAuthError::UnknownProvider(_) => AppError::validation(err.to_string()),
            OAuthError::Http(_) | OAuthError::Provider(_) => AppError::upstream(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::validation(format!("JSON error: {err}"))
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        AppError::validation(format!("Invalid JSON: {err}"))
    }
}

impl From<axum::extract::rejection::QueryRejection> for AppError {
    fn from(err: axum::extract::rejection::QueryRejection) -> Self {
        AppError::validation(format!("Invalid query: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::error::RepositoryError;

    #[test]
    fn not_found_displays_correct_message() {
        let err = AppError::not_found("User");
        assert_eq!(err.to_string(), "Not found: User");
    }

    #[test]
    fn taxonomy_maps_to_expected_statuses() {
        let cases = [
            (AppError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AppError::InvalidRefreshToken, StatusCode::UNAUTHORIZED),
            (AppError::CsrfRejected, StatusCode::FORBIDDEN),
            (
                AppError::QuotaExceeded(UploadDenial::NotEnoughStorage),
                StatusCode::FORBIDDEN,
            ),
            (AppError::not_found("media"), StatusCode::NOT_FOUND),
            (AppError::PasswordMismatch, StatusCode::BAD_REQUEST),
            (AppError::UserAlreadyExists, StatusCode::CONFLICT),
            (AppError::upstream("s3 down"), StatusCode::BAD_GATEWAY),
            (AppError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            let label = err.to_string();
            assert_eq!(err.into_response().status(), status, "{label}");
        }
    }

    #[test]
    fn quota_denial_exposes_reason_code() {
        assert_eq!(
            AppError::QuotaExceeded(UploadDenial::NoPlan).code(),
            "NO_PLAN"
        );
        assert_eq!(
            AppError::QuotaExceeded(UploadDenial::PlanExpired).code(),
            "PLAN_EXPIRED"
        );
    }

    #[test]
    fn unique_violation_becomes_conflict() {
        let err = AppError::from(RepositoryError::UniqueViolation("dup".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn not_found_into_response_sets_404_status() {
        let err = AppError::not_found("User");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
