//! In-memory store and fake collaborators for unit tests.

use crate::auth::external::{ExternalAuthProvider, ExternalIdentity, OAuthError};
use crate::auth::jwt::JwtManager;
use crate::config::JwtConfig;
use crate::db::error::RepositoryError;
use crate::db::models::media::{Media, NewMedia};
use crate::db::models::plan::Plan;
use crate::db::models::plan_notification::{NewPlanNotification, NotificationType};
use crate::db::models::refresh_token::{NewRefreshToken, RefreshToken};
use crate::db::models::user::{ExternalLogin, NewAccount, NewUser, Role, User, UserClaim};
use crate::db::store::{IdentityStore, MediaStore, PlanStore, RefreshTokenStore, UserStore};
use crate::email::{EmailError, EmailMessage, EmailSender};
use crate::payments::{
    CheckoutOrder, CheckoutSession, PaymentError, PaymentProvider, WebhookEvent,
};
use crate::storage::{ObjectStorage, PresignVerb, StorageError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-secret-key-with-at-least-32-characters";

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: TEST_JWT_SECRET.to_string(),
        issuer: "reelbox".to_string(),
        audience: "reelbox-web".to_string(),
        access_token_minutes: 15,
    }
}

pub fn test_jwt() -> JwtManager {
    JwtManager::new(&test_jwt_config())
}

/// Compte par défaut (rôle `User`, droit d'upload), sans mot de passe
pub fn test_user(store: &Arc<MemoryStore>, email: &str) -> User {
    let username = email.split('@').next().unwrap_or(email).to_string();
    store
        .create_account(&NewAccount::with_defaults(NewUser {
            email: email.to_string(),
            username,
            password_hash: None,
            email_confirmed: true,
        }))
        .unwrap()
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    roles: Vec<(Uuid, String)>,
    claims: Vec<UserClaim>,
    logins: HashMap<ExternalLogin, Uuid>,
    refresh_tokens: Vec<RefreshToken>,
    plans: Vec<Plan>,
    notifications: Vec<NewPlanNotification>,
    media: Vec<Media>,
}

impl Tables {
    fn user_mut(&mut self, id: Uuid) -> Result<&mut User, RepositoryError> {
        self.users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| RepositoryError::NotFound(format!("user {id}")))
    }

    fn claim(&mut self, notification: &NewPlanNotification) -> bool {
        let exists = self.notifications.iter().any(|n| {
            n.user_id == notification.user_id
                && n.notification_type == notification.notification_type
                && n.expiration_check_date == notification.expiration_check_date
        });
        if !exists {
            self.notifications.push(notification.clone());
        }
        !exists
    }
}

/// Mirrors the Postgres store: unique keys, cascades and conditional updates.
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        let plan = |id, name: &str, storage_limit_bytes, price_cents| Plan {
            id,
            name: name.to_string(),
            storage_limit_bytes,
            price_cents,
            description: Some(format!("{name} plan")),
        };
        let tables = Tables {
            plans: vec![
                plan(1, "free", 1_073_741_824, 0),
                plan(2, "basic", 10_737_418_240, 499),
                plan(3, "premium", 107_374_182_400, 1499),
            ],
            ..Tables::default()
        };
        Self {
            tables: Mutex::new(tables),
        }
    }
}

impl MemoryStore {
    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    pub fn set_used_memory(&self, user_id: Uuid, bytes: i64) {
        self.tables().user_mut(user_id).unwrap().used_memory_bytes = bytes;
    }

    pub fn notification_types(&self, user_id: Uuid) -> Vec<String> {
        self.tables()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .map(|n| n.notification_type.clone())
            .collect()
    }
}

impl UserStore for MemoryStore {
    fn find_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(self.tables().users.iter().find(|u| u.id == id).cloned())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .tables()
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    fn create_account(&self, account: &NewAccount) -> Result<User, RepositoryError> {
        let mut tables = self.tables();
        if tables.users.iter().any(|u| u.email == account.user.email) {
            return Err(RepositoryError::UniqueViolation("users_email_key".to_string()));
        }
        if let Some(login) = &account.external_login
            && tables.logins.contains_key(login)
        {
            return Err(RepositoryError::UniqueViolation("user_identities_pkey".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: account.user.email.clone(),
            username: account.user.username.clone(),
            password_hash: account.user.password_hash.clone(),
            email_confirmed: account.user.email_confirmed,
            created_at: now,
            updated_at: now,
            used_memory_bytes: 0,
            purchased_memory_bytes: None,
            plan_id: None,
            plan_expiration: None,
        };
        for role in &account.roles {
            tables.roles.push((user.id, role.as_str().to_string()));
        }
        for (claim_type, claim_value) in &account.claims {
            tables.claims.push(UserClaim {
                user_id: user.id,
                claim_type: claim_type.clone(),
                claim_value: claim_value.clone(),
            });
        }
        if let Some(login) = &account.external_login {
            tables.logins.insert(login.clone(), user.id);
        }
        tables.users.push(user.clone());
        Ok(user)
    }

    fn delete_user(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut tables = self.tables();
        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        if tables.users.len() == before {
            return Ok(false);
        }
        tables.roles.retain(|(user_id, _)| *user_id != id);
        tables.claims.retain(|c| c.user_id != id);
        tables.logins.retain(|_, user_id| *user_id != id);
        tables.refresh_tokens.retain(|t| t.user_id != id);
        tables.notifications.retain(|n| n.user_id != id);
        tables.media.retain(|m| m.user_id != id);
        Ok(true)
    }

    fn add_role(&self, user_id: Uuid, role: Role) -> Result<(), RepositoryError> {
        let mut tables = self.tables();
        let entry = (user_id, role.as_str().to_string());
        if !tables.roles.contains(&entry) {
            tables.roles.push(entry);
        }
        Ok(())
    }

    fn roles(&self, user_id: Uuid) -> Result<Vec<String>, RepositoryError> {
        Ok(self
            .tables()
            .roles
            .iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, role)| role.clone())
            .collect())
    }

    fn claims(&self, user_id: Uuid) -> Result<Vec<UserClaim>, RepositoryError> {
        Ok(self
            .tables()
            .claims
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }
}

impl IdentityStore for MemoryStore {
    fn find_user_by_login(&self, login: &ExternalLogin) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables();
        Ok(tables
            .logins
            .get(login)
            .and_then(|id| tables.users.iter().find(|u| u.id == *id))
            .cloned())
    }

    fn link_login(&self, user_id: Uuid, login: &ExternalLogin) -> Result<(), RepositoryError> {
        let mut tables = self.tables();
        if tables.logins.contains_key(login) {
            return Err(RepositoryError::UniqueViolation("user_identities_pkey".to_string()));
        }
        tables.logins.insert(login.clone(), user_id);
        Ok(())
    }
}

impl RefreshTokenStore for MemoryStore {
    fn insert_refresh_token(
        &self,
        token: &NewRefreshToken,
    ) -> Result<RefreshToken, RepositoryError> {
        let row = RefreshToken {
            id: Uuid::new_v4(),
            user_id: token.user_id,
            token: token.token.clone(),
            expires_at: token.expires_at,
            created_at: Utc::now(),
            revoked_at: None,
        };
        self.tables().refresh_tokens.push(row.clone());
        Ok(row)
    }

    fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, RepositoryError> {
        Ok(self
            .tables()
            .refresh_tokens
            .iter()
            .find(|t| t.token == token)
            .cloned())
    }

    fn revoke_refresh_token(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let mut tables = self.tables();
        match tables
            .refresh_tokens
            .iter_mut()
            .find(|t| t.id == id && t.revoked_at.is_none())
        {
            Some(token) => {
                token.revoked_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_expired_refresh_tokens(&self, now: DateTime<Utc>) -> Result<usize, RepositoryError> {
        let mut tables = self.tables();
        let before = tables.refresh_tokens.len();
        tables.refresh_tokens.retain(|t| !t.is_expired(now));
        Ok(before - tables.refresh_tokens.len())
    }
}

impl PlanStore for MemoryStore {
    fn list_plans(&self) -> Result<Vec<Plan>, RepositoryError> {
        let mut plans = self.tables().plans.clone();
        plans.sort_by_key(|p| p.storage_limit_bytes);
        Ok(plans)
    }

    fn find_plan_by_name(&self, name: &str) -> Result<Option<Plan>, RepositoryError> {
        Ok(self.tables().plans.iter().find(|p| p.name == name).cloned())
    }

    fn find_plan(&self, id: i32) -> Result<Option<Plan>, RepositoryError> {
        Ok(self.tables().plans.iter().find(|p| p.id == id).cloned())
    }

    fn set_user_plan(
        &self,
        user_id: Uuid,
        plan: &Plan,
        expiration: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables();
        let user = tables.user_mut(user_id)?;
        user.plan_id = Some(plan.id);
        user.purchased_memory_bytes = Some(plan.storage_limit_bytes);
        user.plan_expiration = Some(expiration);
        Ok(())
    }

    fn unassign_plan(&self, user_id: Uuid) -> Result<(), RepositoryError> {
        let mut tables = self.tables();
        let user = tables.user_mut(user_id)?;
        user.plan_id = None;
        user.purchased_memory_bytes = None;
        Ok(())
    }

    fn users_with_plan_expiration(&self) -> Result<Vec<User>, RepositoryError> {
        Ok(self
            .tables()
            .users
            .iter()
            .filter(|u| u.plan_expiration.is_some())
            .cloned()
            .collect())
    }

    fn try_increase_used_memory(&self, user_id: Uuid, bytes: i64) -> Result<bool, RepositoryError> {
        let mut tables = self.tables();
        let Some(user) = tables.users.iter_mut().find(|u| u.id == user_id) else {
            return Ok(false);
        };
        let fits = user
            .purchased_memory_bytes
            .zip(user.used_memory_bytes.checked_add(bytes))
            .is_some_and(|(purchased, total)| total <= purchased);
        if fits {
            user.used_memory_bytes += bytes;
        }
        Ok(fits)
    }

    fn decrease_used_memory(&self, user_id: Uuid, bytes: i64) -> Result<(), RepositoryError> {
        let mut tables = self.tables();
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == user_id) {
            user.used_memory_bytes = (user.used_memory_bytes - bytes).max(0);
        }
        Ok(())
    }

    fn claim_notification(
        &self,
        notification: &NewPlanNotification,
    ) -> Result<bool, RepositoryError> {
        Ok(self.tables().claim(notification))
    }

    fn release_notification(
        &self,
        user_id: Uuid,
        kind: NotificationType,
        expiration_check_date: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.tables().notifications.retain(|n| {
            !(n.user_id == user_id
                && n.notification_type == kind.as_str()
                && n.expiration_check_date == expiration_check_date)
        });
        Ok(())
    }

    fn has_notification(
        &self,
        user_id: Uuid,
        kind: NotificationType,
        expiration_check_date: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        Ok(self.tables().notifications.iter().any(|n| {
            n.user_id == user_id
                && n.notification_type == kind.as_str()
                && n.expiration_check_date == expiration_check_date
        }))
    }

    fn purge_expired_plan(
        &self,
        user_id: Uuid,
        expiration: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<Uuid>>, RepositoryError> {
        let mut tables = self.tables();
        let claim = NewPlanNotification::new(user_id, NotificationType::Expired, expiration, now);
        if !tables.claim(&claim) {
            return Ok(None);
        }

        let deleted: Vec<Uuid> = tables
            .media
            .iter()
            .filter(|m| m.user_id == user_id)
            .map(|m| m.id)
            .collect();
        tables.media.retain(|m| m.user_id != user_id);

        let user = tables.user_mut(user_id)?;
        user.plan_id = None;
        user.purchased_memory_bytes = None;
        user.plan_expiration = None;
        user.used_memory_bytes = 0;
        Ok(Some(deleted))
    }
}

impl MediaStore for MemoryStore {
    fn insert_media(&self, media: &NewMedia) -> Result<Media, RepositoryError> {
        let mut tables = self.tables();
        if tables.media.iter().any(|m| m.id == media.id) {
            return Err(RepositoryError::UniqueViolation("media_pkey".to_string()));
        }
        let row = Media {
            id: media.id,
            user_id: media.user_id,
            file_name: media.file_name.clone(),
            content_type: media.content_type.clone(),
            file_size: media.file_size,
            uploaded_at: Utc::now(),
            status: media.status.clone(),
        };
        tables.media.push(row.clone());
        Ok(row)
    }

    fn find_media(&self, id: Uuid) -> Result<Option<Media>, RepositoryError> {
        Ok(self.tables().media.iter().find(|m| m.id == id).cloned())
    }

    fn media_for_user(&self, user_id: Uuid) -> Result<Vec<Media>, RepositoryError> {
        // Plus récent d'abord, ordre d'insertion inverse à égalité
        let mut media: Vec<Media> = self
            .tables()
            .media
            .iter()
            .rev()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        media.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(media)
    }

    fn delete_media(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut tables = self.tables();
        let before = tables.media.len();
        tables.media.retain(|m| m.id != id);
        Ok(tables.media.len() != before)
    }
}

/// Presigned URLs are fake, deletions are recorded
#[derive(Default)]
pub struct FakeStorage {
    deleted: Mutex<Vec<String>>,
}

impl FakeStorage {
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    fn presign(&self, key: &str, verb: PresignVerb, ttl: Duration) -> Result<String, StorageError> {
        Ok(format!(
            "https://storage.test/{key}?verb={}&ttl={}",
            verb.as_str(),
            ttl.as_secs()
        ))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        if self.fail {
            return Err(EmailError::Rejected {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Accepts webhooks whose signature header is exactly `valid`
pub struct FakePayments {
    orders: Mutex<Vec<CheckoutOrder>>,
    event: WebhookEvent,
    line_item: Option<String>,
}

impl Default for FakePayments {
    fn default() -> Self {
        Self {
            orders: Mutex::new(Vec::new()),
            event: WebhookEvent::Other("ping".to_string()),
            line_item: None,
        }
    }
}

impl FakePayments {
    pub fn completed(user_id: Uuid, plan: &str) -> Self {
        Self {
            event: WebhookEvent::CheckoutCompleted {
                session_id: "cs_test_completed".to_string(),
                client_reference_id: Some(user_id.to_string()),
            },
            line_item: Some(plan.to_string()),
            ..Self::default()
        }
    }

    pub fn orders(&self) -> Vec<CheckoutOrder> {
        self.orders.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProvider for FakePayments {
    async fn create_checkout_session(
        &self,
        order: &CheckoutOrder,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut orders = self.orders.lock().unwrap();
        orders.push(order.clone());
        let id = format!("cs_test_{}", orders.len());
        Ok(CheckoutSession {
            url: format!("https://checkout.test/{id}"),
            id,
        })
    }

    fn parse_webhook(
        &self,
        _payload: &str,
        signature_header: &str,
        _now: DateTime<Utc>,
    ) -> Result<WebhookEvent, PaymentError> {
        if signature_header != "valid" {
            return Err(PaymentError::InvalidSignature);
        }
        Ok(self.event.clone())
    }

    async fn first_line_item_description(
        &self,
        _session_id: &str,
    ) -> Result<Option<String>, PaymentError> {
        Ok(self.line_item.clone())
    }
}

/// Provider named `google` accepting the code `good`
pub struct FakeOAuthProvider {
    identity: ExternalIdentity,
}

impl FakeOAuthProvider {
    pub fn new(identity: ExternalIdentity) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl ExternalAuthProvider for FakeOAuthProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn authorization_url(&self, state: &str) -> Result<String, OAuthError> {
        Url::parse_with_params("https://oauth.test/authorize", &[("state", state)])
            .map(Into::into)
            .map_err(|e| OAuthError::Provider(e.to_string()))
    }

    async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, OAuthError> {
        if code == "good" {
            Ok(self.identity.clone())
        } else {
            Err(OAuthError::Provider("invalid_grant".to_string()))
        }
    }
}
