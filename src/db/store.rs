//! Persistence seams used by the services.
//!
//! Every trait is synchronous: the Postgres implementation runs diesel on a
//! pooled connection, the in-memory implementation used by tests takes a lock.

use super::error::RepositoryError;
use super::models::media::{Media, NewMedia};
use super::models::plan::Plan;
use super::models::plan_notification::{NewPlanNotification, NotificationType};
use super::models::refresh_token::{NewRefreshToken, RefreshToken};
use super::models::user::{ExternalLogin, NewAccount, Role, User, UserClaim};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub trait UserStore: Send + Sync {
    fn find_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    /// Creates the user with its roles, claims and optional external login
    /// as a single unit.
    fn create_account(&self, account: &NewAccount) -> Result<User, RepositoryError>;
    fn delete_user(&self, id: Uuid) -> Result<bool, RepositoryError>;
    fn add_role(&self, user_id: Uuid, role: Role) -> Result<(), RepositoryError>;
    fn roles(&self, user_id: Uuid) -> Result<Vec<String>, RepositoryError>;
    fn claims(&self, user_id: Uuid) -> Result<Vec<UserClaim>, RepositoryError>;
}

pub trait IdentityStore: Send + Sync {
    fn find_user_by_login(&self, login: &ExternalLogin) -> Result<Option<User>, RepositoryError>;
    fn link_login(&self, user_id: Uuid, login: &ExternalLogin) -> Result<(), RepositoryError>;
}

pub trait RefreshTokenStore: Send + Sync {
    fn insert_refresh_token(&self, token: &NewRefreshToken)
    -> Result<RefreshToken, RepositoryError>;
    fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, RepositoryError>;
    /// Conditional revoke. Returns `false` when the token was already revoked.
    fn revoke_refresh_token(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, RepositoryError>;
    fn delete_expired_refresh_tokens(&self, now: DateTime<Utc>) -> Result<usize, RepositoryError>;
}

pub trait PlanStore: Send + Sync {
    fn list_plans(&self) -> Result<Vec<Plan>, RepositoryError>;
    fn find_plan_by_name(&self, name: &str) -> Result<Option<Plan>, RepositoryError>;
    fn find_plan(&self, id: i32) -> Result<Option<Plan>, RepositoryError>;
    fn set_user_plan(
        &self,
        user_id: Uuid,
        plan: &Plan,
        expiration: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
    /// Drops the plan and purchased bytes, keeps `plan_expiration`.
    fn unassign_plan(&self, user_id: Uuid) -> Result<(), RepositoryError>;
    fn users_with_plan_expiration(&self) -> Result<Vec<User>, RepositoryError>;
    /// `used + bytes <= purchased` checked and applied atomically.
    fn try_increase_used_memory(&self, user_id: Uuid, bytes: i64) -> Result<bool, RepositoryError>;
    /// Clamped at zero.
    fn decrease_used_memory(&self, user_id: Uuid, bytes: i64) -> Result<(), RepositoryError>;
    /// Records the notification unless the same (user, type, expiration) row
    /// exists. Returns whether this call inserted it.
    fn claim_notification(&self, notification: &NewPlanNotification)
    -> Result<bool, RepositoryError>;
    fn release_notification(
        &self,
        user_id: Uuid,
        kind: NotificationType,
        expiration_check_date: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
    fn has_notification(
        &self,
        user_id: Uuid,
        kind: NotificationType,
        expiration_check_date: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;
    /// Claims the `Expired` notification, deletes every media row and clears
    /// the plan fields in one transaction. `None` when the claim already
    /// existed, otherwise the deleted media ids.
    fn purge_expired_plan(
        &self,
        user_id: Uuid,
        expiration: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<Uuid>>, RepositoryError>;
}

pub trait MediaStore: Send + Sync {
    fn insert_media(&self, media: &NewMedia) -> Result<Media, RepositoryError>;
    fn find_media(&self, id: Uuid) -> Result<Option<Media>, RepositoryError>;
    /// Newest first.
    fn media_for_user(&self, user_id: Uuid) -> Result<Vec<Media>, RepositoryError>;
    fn delete_media(&self, id: Uuid) -> Result<bool, RepositoryError>;
}

pub trait Store: UserStore + IdentityStore + RefreshTokenStore + PlanStore + MediaStore {}

impl<T> Store for T where
    T: UserStore + IdentityStore + RefreshTokenStore + PlanStore + MediaStore
{
}
