// src/auth/services.rs

use super::password::PasswordManager;
use super::tokens::{Session, TokenService};
use crate::db::models::plan::FREE_PLAN;
use crate::db::models::user::{NewAccount, NewUser, User};
use crate::db::store::Store;
use crate::error::AppError;
use crate::plans::quota::QuotaEngine;
use chrono::Utc;
use reelbox_api::{LoginRequest, RegisterRequest};
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    passwords: PasswordManager,
    tokens: TokenService,
    quota: QuotaEngine,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn Store>,
        passwords: PasswordManager,
        tokens: TokenService,
        quota: QuotaEngine,
    ) -> Self {
        Self {
            store,
            passwords,
            tokens,
            quota,
        }
    }

    /// Inscription: crée le compte, lui attribue le plan gratuit puis ouvre une session
    pub fn register(&self, request: RegisterRequest) -> Result<(User, Session), AppError> {
        let email = request.email.trim().to_lowercase();

        // Validation email
        if !Self::is_valid_email(&email) {
            return Err(AppError::InvalidEmail);
        }

        if request.password != request.password_confirm {
            return Err(AppError::PasswordMismatch);
        }

        // Validation password
        if !Self::is_strong_password(&request.password) {
            return Err(AppError::WeakPassword(
                "Password must be at least 8 characters with uppercase, lowercase and numbers"
                    .to_string(),
            ));
        }

        // Vérifier que l'email n'existe pas
        if self.store.find_user_by_email(&email)?.is_some() {
            return Err(AppError::UserAlreadyExists);
        }

        let password_hash = self.passwords.hash(&request.password)?;
        let username = request
            .username
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| email.clone());

        let user = self
            .store
            .create_account(&NewAccount::with_defaults(NewUser {
                email,
                username,
                password_hash: Some(password_hash),
                email_confirmed: false,
            }))
            .map_err(|e| match AppError::from(e) {
                // Course entre deux inscriptions simultanées
                AppError::Duplicate(_) => AppError::UserAlreadyExists,
                other => other,
            })?;

        match self.quota.assign_plan(user.id, FREE_PLAN, Utc::now()) {
            Ok(_) => {}
            Err(AppError::NotFound(_)) => {
                tracing::warn!(
                    user_id = %user.id,
                    "Free plan missing, account created without plan"
                );
            }
            Err(e) => return Err(e),
        }

        tracing::info!(user_id = %user.id, "User registered");
        let session = self.tokens.issue_session(&user)?;
        Ok((user, session))
    }

    /// Connexion d'un utilisateur
    pub fn login(&self, request: &LoginRequest) -> Result<(User, Session), AppError> {
        let email = request.email.trim().to_lowercase();
        if !Self::is_valid_email(&email) {
            return Err(AppError::InvalidEmail);
        }

        // Même erreur pour un compte inconnu ou sans mot de passe local
        let user = self
            .store
            .find_user_by_email(&email)?
            .ok_or(AppError::InvalidCredentials)?;
        let password_hash = user
            .password_hash
            .as_deref()
            .ok_or(AppError::InvalidCredentials)?;

        if !self.passwords.verify(&request.password, password_hash)? {
            tracing::debug!(user_id = %user.id, "Wrong password");
            return Err(AppError::InvalidCredentials);
        }

        let session = self.tokens.issue_session(&user)?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok((user, session))
    }

    // === Helpers de validation ===

    fn is_valid_email(email: &str) -> bool {
        let Some((local, domain)) = email.split_once('@') else {
            return false;
        };
        !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && email.len() > 5
    }

    fn is_strong_password(password: &str) -> bool {
        if password.len() < 8 {
            return false;
        }
        let (mut upper, mut lower, mut digit) = (false, false, false);
        for c in password.chars() {
            upper |= c.is_uppercase();
            lower |= c.is_lowercase();
            digit |= c.is_ascii_digit();
            if upper && lower && digit {
                return true;
            }
        }
        upper && lower && digit
    }
}
