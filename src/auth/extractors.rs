use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header, request::Parts};
use std::collections::BTreeMap;

use crate::auth::jwt::{Claims, JwtManager};
use crate::error::AppError;

/// Extracteur d'authentification pour les routes protégées.
/// Valide `Authorization: Bearer <JWT>` via le `JwtManager` de l'état
/// et expose l'identité, les rôles et les claims applicatifs.
#[derive(Debug, Clone)]
pub struct AuthClaims {
    pub sub: uuid::Uuid,
    pub email: String,
    pub roles: Vec<String>,
    pub custom: BTreeMap<String, String>,
}

impl AuthClaims {
    pub fn has_claim(&self, claim_type: &str, expected: &str) -> bool {
        self.custom
            .get(claim_type)
            .is_some_and(|v| v.eq_ignore_ascii_case(expected))
    }

    pub fn require_claim(&self, claim_type: &str, expected: &str) -> Result<(), AppError> {
        if self.has_claim(claim_type, expected) {
            Ok(())
        } else {
            Err(AppError::forbidden(format!("Missing claim {claim_type}")))
        }
    }
}

impl From<Claims> for AuthClaims {
    fn from(c: Claims) -> Self {
        Self {
            sub: c.sub,
            email: c.email,
            roles: c.roles,
            custom: c.custom,
        }
    }
}

impl<S> FromRequestParts<S> for AuthClaims
where
    JwtManager: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jwt_manager = JwtManager::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::InvalidAccessToken)?;

        let claims = jwt_manager
            .verify_token(token)
            .map_err(|_| AppError::InvalidAccessToken)?;

        Ok(AuthClaims::from(claims))
    }
}
