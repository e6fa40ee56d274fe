//! External (OAuth) login: provider round-trip and account linking.
//!
//! On callback the provider identity is resolved to a local account:
//! - already linked login: sign in
//! - unknown login, known email: link the login to that account, sign in
//! - unknown email: create a confirmed account with the login, sign in
//!
//! The provider-asserted email is trusted for the second case, no extra
//! verification step happens before linking.

use super::csrf::{CsrfGate, url_origin};
use super::tokens::{Session, TokenService};
use crate::db::models::plan::FREE_PLAN;
use crate::db::models::user::{ExternalLogin, NewAccount, NewUser, User};
use crate::db::store::Store;
use crate::error::AppError;
use crate::plans::quota::QuotaEngine;
use async_trait::async_trait;
use chrono::Utc;
use reelbox_api::ExternalLoginCallbackQuery;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("Missing external login information: {0}")]
    MissingCallbackInfo(String),
    #[error("Email claim missing from external provider")]
    MissingEmail,
    #[error("Unknown login provider: {0}")]
    UnknownProvider(String),
    #[error("Provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Provider error: {0}")]
    Provider(String),
}

/// Identité affirmée par le fournisseur
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub provider: String,
    pub provider_key: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[async_trait]
pub trait ExternalAuthProvider: Send + Sync {
    fn name(&self) -> &str;

    /// URL the browser is sent to, carrying our signed `state`.
    fn authorization_url(&self, state: &str) -> Result<String, OAuthError>;

    async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, OAuthError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Linked,
    LinkedExisting,
    Created,
}

#[derive(Debug)]
pub struct ExternalLoginSuccess {
    pub user: User,
    pub session: Session,
    pub outcome: LinkOutcome,
    pub redirect_url: String,
}

/// Échec du callback, avec l'URL où renvoyer le navigateur
#[derive(Debug)]
pub struct ExternalLoginFailure {
    pub error: AppError,
    pub redirect_url: String,
}

#[derive(Clone)]
pub struct ExternalLoginService {
    store: Arc<dyn Store>,
    tokens: TokenService,
    quota: QuotaEngine,
    providers: HashMap<String, Arc<dyn ExternalAuthProvider>>,
    origins: Arc<CsrfGate>,
    fallback_url: String,
}

impl ExternalLoginService {
    pub fn new(
        store: Arc<dyn Store>,
        tokens: TokenService,
        quota: QuotaEngine,
        origins: Arc<CsrfGate>,
        fallback_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            tokens,
            quota,
            providers: HashMap::new(),
            origins,
            fallback_url: fallback_url.into(),
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn ExternalAuthProvider>) -> Self {
        self.providers
            .insert(provider.name().to_ascii_lowercase(), provider);
        self
    }

    fn provider(&self, name: &str) -> Result<&Arc<dyn ExternalAuthProvider>, OAuthError> {
        self.providers
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| OAuthError::UnknownProvider(name.to_string()))
    }

    /// Seules les URLs absolues sur une origine autorisée sont acceptées
    pub fn validate_return_url(&self, raw: &str) -> Result<Url, AppError> {
        let allowed = url_origin(raw).is_some_and(|origin| self.origins.is_allowed_origin(&origin));
        if !allowed {
            return Err(AppError::validation("Invalid return URL"));
        }
        Url::parse(raw.trim()).map_err(|_| AppError::validation("Invalid return URL"))
    }

    /// Première étape: URL du fournisseur vers laquelle rediriger
    pub fn begin(&self, provider: &str, return_url: &str) -> Result<String, AppError> {
        let provider = self.provider(provider)?;
        let return_url = self.validate_return_url(return_url)?;
        let state = self
            .tokens
            .jwt()
            .sign_oauth_state(provider.name(), return_url.as_str())?;

        Ok(provider.authorization_url(&state)?)
    }

    pub async fn complete(
        &self,
        query: &ExternalLoginCallbackQuery,
    ) -> Result<ExternalLoginSuccess, ExternalLoginFailure> {
        // Sans state valide, seule une returnUrl autorisée du query est utilisable
        let state = query
            .state
            .as_deref()
            .ok_or_else(|| AppError::from(OAuthError::MissingCallbackInfo("state".to_string())))
            .and_then(|raw| {
                self.tokens
                    .jwt()
                    .verify_oauth_state(raw)
                    .map_err(|_| AppError::unauthorized("Invalid or expired login state"))
            });
        let state = match state {
            Ok(state) => state,
            Err(error) => {
                let redirect_url = self.failure_redirect(query.return_url.as_deref(), &error);
                return Err(ExternalLoginFailure {
                    error,
                    redirect_url,
                });
            }
        };

        match self.finish(&state.provider, &state.return_url, query).await {
            Ok(success) => Ok(success),
            Err(error) => {
                tracing::warn!(provider = %state.provider, error = %error, "External login failed");
                let redirect_url = self.failure_redirect(Some(&state.return_url), &error);
                Err(ExternalLoginFailure {
                    error,
                    redirect_url,
                })
            }
        }
    }

    async fn finish(
        &self,
        provider_name: &str,
        return_url: &str,
        query: &ExternalLoginCallbackQuery,
    ) -> Result<ExternalLoginSuccess, AppError> {
        let mut return_url = self.validate_return_url(return_url)?;

        if let Some(error) = query.error.as_deref() {
            return Err(
                OAuthError::MissingCallbackInfo(format!("provider returned {error}")).into(),
            );
        }
        let code = query
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| OAuthError::MissingCallbackInfo("code".to_string()))?;

        let identity = self.provider(provider_name)?.exchange_code(code).await?;
        let (user, outcome) = self.link_identity(&identity)?;
        let session = self.tokens.issue_session(&user)?;

        // Le navigateur est redirigé: l'access token voyage dans l'URL
        return_url
            .query_pairs_mut()
            .append_pair("accessToken", &session.access.token);

        tracing::info!(
            user_id = %user.id,
            provider = provider_name,
            ?outcome,
            "External login succeeded"
        );
        Ok(ExternalLoginSuccess {
            user,
            session,
            outcome,
            redirect_url: return_url.into(),
        })
    }

    /// Résout l'identité externe en compte local
    pub fn link_identity(
        &self,
        identity: &ExternalIdentity,
    ) -> Result<(User, LinkOutcome), AppError> {
        if identity.provider.is_empty() || identity.provider_key.is_empty() {
            return Err(OAuthError::MissingCallbackInfo("provider key".to_string()).into());
        }
        let email = identity
            .email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .ok_or(OAuthError::MissingEmail)?;
        let login = ExternalLogin {
            provider: identity.provider.clone(),
            provider_key: identity.provider_key.clone(),
        };

        if let Some(user) = self.store.find_user_by_login(&login)? {
            return Ok((user, LinkOutcome::Linked));
        }

        if let Some(user) = self.store.find_user_by_email(&email)? {
            self.store.link_login(user.id, &login)?;
            tracing::info!(
                user_id = %user.id,
                provider = %login.provider,
                "External login linked to existing account"
            );
            return Ok((user, LinkOutcome::LinkedExisting));
        }

        let username = identity
            .display_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email.clone());
        let user = self.store.create_account(
            &NewAccount::with_defaults(NewUser {
                email,
                username,
                password_hash: None,
                email_confirmed: true,
            })
            .linked_to(login),
        )?;

        match self.quota.assign_plan(user.id, FREE_PLAN, Utc::now()) {
            Ok(_) | Err(AppError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        tracing::info!(
            user_id = %user.id,
            provider = %identity.provider,
            "Account created from external login"
        );
        Ok((user, LinkOutcome::Created))
    }

    fn failure_redirect(&self, return_url: Option<&str>, error: &AppError) -> String {
        let mut target = return_url
            .and_then(|raw| self.validate_return_url(raw).ok())
            .or_else(|| Url::parse(&self.fallback_url).ok());

        match target.as_mut() {
            Some(url) => {
                url.query_pairs_mut().append_pair("error", error.code());
                url.to_string()
            }
            None => format!("/?error={}", error.code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::{IdentityStore, UserStore};
    use crate::testing::{FakeOAuthProvider, MemoryStore, test_jwt, test_user};

    const ORIGIN: &str = "http://localhost:5173";

    fn identity(key: &str, email: Option<&str>) -> ExternalIdentity {
        ExternalIdentity {
            provider: "google".to_string(),
            provider_key: key.to_string(),
            email: email.map(str::to_string),
            display_name: Some("Ext User".to_string()),
        }
    }

    fn service(store: &Arc<MemoryStore>, provider: FakeOAuthProvider) -> ExternalLoginService {
        ExternalLoginService::new(
            store.clone(),
            TokenService::new(store.clone(), test_jwt(), 1),
            QuotaEngine::new(store.clone()),
            Arc::new(CsrfGate::new([ORIGIN])),
            ORIGIN,
        )
        .with_provider(Arc::new(provider))
    }

    fn callback(state: Option<String>, code: Option<&str>) -> ExternalLoginCallbackQuery {
        ExternalLoginCallbackQuery {
            code: code.map(str::to_string),
            state,
            ..Default::default()
        }
    }

    #[test]
    fn unknown_email_creates_confirmed_account() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(&store, FakeOAuthProvider::new(identity("g-1", None)));

        let (user, outcome) = svc
            .link_identity(&identity("g-1", Some("New@Example.com")))
            .unwrap();

        assert_eq!(outcome, LinkOutcome::Created);
        assert!(user.email_confirmed);
        assert!(user.password_hash.is_none());
        assert_eq!(user.email, "new@example.com");
        assert_eq!(user.username, "Ext User");
        assert_eq!(store.roles(user.id).unwrap(), vec!["User".to_string()]);
        let login = ExternalLogin {
            provider: "google".to_string(),
            provider_key: "g-1".to_string(),
        };
        assert_eq!(store.find_user_by_login(&login).unwrap().unwrap().id, user.id);
    }

    #[test]
    fn matching_email_links_existing_account() {
        let store = Arc::new(MemoryStore::default());
        let existing = test_user(&store, "known@example.com");
        let svc = service(&store, FakeOAuthProvider::new(identity("g-2", None)));

        let (user, outcome) = svc
            .link_identity(&identity("g-2", Some("known@example.com")))
            .unwrap();

        assert_eq!(outcome, LinkOutcome::LinkedExisting);
        assert_eq!(user.id, existing.id);
    }

    #[test]
    fn linked_login_signs_in_directly() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(&store, FakeOAuthProvider::new(identity("g-3", None)));
        let (first, _) = svc
            .link_identity(&identity("g-3", Some("repeat@example.com")))
            .unwrap();

        // L'email côté fournisseur a changé, le login reste lié
        let (again, outcome) = svc
            .link_identity(&identity("g-3", Some("renamed@example.com")))
            .unwrap();

        assert_eq!(outcome, LinkOutcome::Linked);
        assert_eq!(again.id, first.id);
    }

    #[test]
    fn missing_email_is_rejected() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(&store, FakeOAuthProvider::new(identity("g-4", None)));

        let result = svc.link_identity(&identity("g-4", None));

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn begin_rejects_foreign_return_url_and_unknown_provider() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(&store, FakeOAuthProvider::new(identity("g-5", None)));

        assert!(matches!(
            svc.begin("google", "https://evil.example/steal"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            svc.begin("github", &format!("{ORIGIN}/home")),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn full_round_trip_redirects_with_access_token() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(
            &store,
            FakeOAuthProvider::new(identity("g-6", Some("trip@example.com"))),
        );

        let authorize = svc.begin("google", &format!("{ORIGIN}/auth/done")).unwrap();
        let state = Url::parse(&authorize)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned());

        let success = svc.complete(&callback(state, Some("good"))).await.unwrap();

        assert_eq!(success.outcome, LinkOutcome::Created);
        assert!(
            success
                .redirect_url
                .starts_with("http://localhost:5173/auth/done?accessToken=")
        );
        let claims = test_jwt().verify_token(&success.session.access.token).unwrap();
        assert_eq!(claims.sub, success.user.id);
    }

    #[tokio::test]
    async fn invalid_state_redirects_with_error_code() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(&store, FakeOAuthProvider::new(identity("g-7", Some("x@example.com"))));

        let failure = svc
            .complete(&callback(Some("forged".to_string()), Some("good")))
            .await
            .unwrap_err();

        assert!(matches!(failure.error, AppError::Unauthorized(_)));
        assert!(failure.redirect_url.starts_with("http://localhost:5173/?error="));
    }

    #[tokio::test]
    async fn provider_denial_returns_to_caller_page() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(&store, FakeOAuthProvider::new(identity("g-8", Some("y@example.com"))));
        let state = test_jwt()
            .sign_oauth_state("google", &format!("{ORIGIN}/login"))
            .unwrap();

        let query = ExternalLoginCallbackQuery {
            error: Some("access_denied".to_string()),
            ..callback(Some(state), None)
        };
        let failure = svc.complete(&query).await.unwrap_err();

        assert!(failure.redirect_url.starts_with("http://localhost:5173/login?error="));
    }
}
