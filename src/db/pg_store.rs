use super::connection::get_connection;
use super::error::RepositoryError;
use super::models::identity::NewUserIdentity;
use super::models::media::{Media, NewMedia};
use super::models::plan::Plan;
use super::models::plan_notification::{NewPlanNotification, NotificationType};
use super::models::refresh_token::{NewRefreshToken, RefreshToken};
use super::models::user::{ExternalLogin, NewAccount, Role, User, UserClaim};
use super::repositories::identity_repository::IdentityRepository;
use super::repositories::media_repository::MediaRepository;
use super::repositories::notification_repository::NotificationRepository;
use super::repositories::plan_repository::PlanRepository;
use super::repositories::refresh_token_repository::RefreshTokenRepository;
use super::repositories::user_repository::UserRepository;
use super::store::{IdentityStore, MediaStore, PlanStore, RefreshTokenStore, UserStore};
use chrono::{DateTime, Utc};
use diesel::Connection;
use uuid::Uuid;

/// Store backed by the global Postgres pool
#[derive(Debug, Clone, Copy, Default)]
pub struct PgStore;

impl UserStore for PgStore {
    fn find_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let mut conn = get_connection()?;
        UserRepository::find_by_id(&mut conn, id)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let mut conn = get_connection()?;
        UserRepository::find_by_email(&mut conn, email)
    }

    fn create_account(&self, account: &NewAccount) -> Result<User, RepositoryError> {
        let mut conn = get_connection()?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            let user = UserRepository::create(conn, &account.user)?;
            for role in &account.roles {
                UserRepository::add_role(conn, user.id, role.as_str())?;
            }
            for (claim_type, claim_value) in &account.claims {
                UserRepository::set_claim(
                    conn,
                    &UserClaim {
                        user_id: user.id,
                        claim_type: claim_type.clone(),
                        claim_value: claim_value.clone(),
                    },
                )?;
            }
            if let Some(login) = &account.external_login {
                IdentityRepository::link(
                    conn,
                    &NewUserIdentity {
                        provider: &login.provider,
                        provider_key: &login.provider_key,
                        user_id: user.id,
                    },
                )?;
            }
            Ok(user)
        })
    }

    fn delete_user(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut conn = get_connection()?;
        UserRepository::delete(&mut conn, id)
    }

    fn add_role(&self, user_id: Uuid, role: Role) -> Result<(), RepositoryError> {
        let mut conn = get_connection()?;
        UserRepository::add_role(&mut conn, user_id, role.as_str())
    }

    fn roles(&self, user_id: Uuid) -> Result<Vec<String>, RepositoryError> {
        let mut conn = get_connection()?;
        UserRepository::roles(&mut conn, user_id)
    }

    fn claims(&self, user_id: Uuid) -> Result<Vec<UserClaim>, RepositoryError> {
        let mut conn = get_connection()?;
        UserRepository::claims(&mut conn, user_id)
    }
}

impl IdentityStore for PgStore {
    fn find_user_by_login(&self, login: &ExternalLogin) -> Result<Option<User>, RepositoryError> {
        let mut conn = get_connection()?;
        IdentityRepository::find_user_by_login(
            &mut conn,
            &login.provider,
            &login.provider_key,
        )
    }

    fn link_login(&self, user_id: Uuid, login: &ExternalLogin) -> Result<(), RepositoryError> {
        let mut conn = get_connection()?;
        IdentityRepository::link(
            &mut conn,
            &NewUserIdentity {
                provider: &login.provider,
                provider_key: &login.provider_key,
                user_id,
            },
        )
    }
}

impl RefreshTokenStore for PgStore {
    fn insert_refresh_token(
        &self,
        token: &NewRefreshToken,
    ) -> Result<RefreshToken, RepositoryError> {
        let mut conn = get_connection()?;
        RefreshTokenRepository::create(&mut conn, token)
    }

    fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, RepositoryError> {
        let mut conn = get_connection()?;
        RefreshTokenRepository::find_by_token(&mut conn, token)
    }

    fn revoke_refresh_token(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let mut conn = get_connection()?;
        RefreshTokenRepository::revoke(&mut conn, id, at)
    }

    fn delete_expired_refresh_tokens(&self, now: DateTime<Utc>) -> Result<usize, RepositoryError> {
        let mut conn = get_connection()?;
        RefreshTokenRepository::delete_expired(&mut conn, now)
    }
}

impl PlanStore for PgStore {
    fn list_plans(&self) -> Result<Vec<Plan>, RepositoryError> {
        let mut conn = get_connection()?;
        PlanRepository::list(&mut conn)
    }

    fn find_plan_by_name(&self, name: &str) -> Result<Option<Plan>, RepositoryError> {
        let mut conn = get_connection()?;
        PlanRepository::find_by_name(&mut conn, name)
    }

    fn find_plan(&self, id: i32) -> Result<Option<Plan>, RepositoryError> {
        let mut conn = get_connection()?;
        PlanRepository::find_by_id(&mut conn, id)
    }

    fn set_user_plan(
        &self,
        user_id: Uuid,
        plan: &Plan,
        expiration: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut conn = get_connection()?;
        UserRepository::set_plan(
            &mut conn,
            user_id,
            plan.id,
            plan.storage_limit_bytes,
            expiration,
        )
    }

    fn unassign_plan(&self, user_id: Uuid) -> Result<(), RepositoryError> {
        let mut conn = get_connection()?;
        UserRepository::unassign_plan(&mut conn, user_id)
    }

    fn users_with_plan_expiration(&self) -> Result<Vec<User>, RepositoryError> {
        let mut conn = get_connection()?;
        UserRepository::with_plan_expiration(&mut conn)
    }

    fn try_increase_used_memory(&self, user_id: Uuid, bytes: i64) -> Result<bool, RepositoryError> {
        let mut conn = get_connection()?;
        UserRepository::try_increase_used_memory(&mut conn, user_id, bytes)
    }

    fn decrease_used_memory(&self, user_id: Uuid, bytes: i64) -> Result<(), RepositoryError> {
        let mut conn = get_connection()?;
        UserRepository::decrease_used_memory(&mut conn, user_id, bytes)
    }

    fn claim_notification(
        &self,
        notification: &NewPlanNotification,
    ) -> Result<bool, RepositoryError> {
        let mut conn = get_connection()?;
        NotificationRepository::claim(&mut conn, notification)
    }

    fn release_notification(
        &self,
        user_id: Uuid,
        kind: NotificationType,
        expiration_check_date: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut conn = get_connection()?;
        NotificationRepository::release(&mut conn, user_id, kind, expiration_check_date)
    }

    fn has_notification(
        &self,
        user_id: Uuid,
        kind: NotificationType,
        expiration_check_date: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut conn = get_connection()?;
        NotificationRepository::exists(&mut conn, user_id, kind, expiration_check_date)
    }

    fn purge_expired_plan(
        &self,
        user_id: Uuid,
        expiration: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<Uuid>>, RepositoryError> {
        let mut conn = get_connection()?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            let notification =
                NewPlanNotification::new(user_id, NotificationType::Expired, expiration, now);
            if !NotificationRepository::claim(conn, &notification)? {
                return Ok(None);
            }
            let deleted = MediaRepository::delete_for_user(conn, user_id)?;
            UserRepository::clear_plan(conn, user_id)?;
            Ok(Some(deleted))
        })
    }
}

impl MediaStore for PgStore {
    fn insert_media(&self, media: &NewMedia) -> Result<Media, RepositoryError> {
        let mut conn = get_connection()?;
        MediaRepository::create(&mut conn, media)
    }

    fn find_media(&self, id: Uuid) -> Result<Option<Media>, RepositoryError> {
        let mut conn = get_connection()?;
        MediaRepository::find_by_id(&mut conn, id)
    }

    fn media_for_user(&self, user_id: Uuid) -> Result<Vec<Media>, RepositoryError> {
        let mut conn = get_connection()?;
        MediaRepository::for_user(&mut conn, user_id)
    }

    fn delete_media(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut conn = get_connection()?;
        MediaRepository::delete(&mut conn, id)
    }
}
