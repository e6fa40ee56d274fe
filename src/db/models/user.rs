use crate::db::schema::{user_claims, user_roles, users};
use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable, Selectable};
use reelbox_api::UserResponse;
use uuid::Uuid;

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: Option<String>,
    pub email_confirmed: bool,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: Option<String>,
    pub email_confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub used_memory_bytes: i64,
    pub purchased_memory_bytes: Option<i64>,
    pub plan_id: Option<i32>,
    pub plan_expiration: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            email: user.email,
            username: user.username,
            email_confirmed: user.email_confirmed,
            created_at: user.created_at,
        }
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = user_roles)]
pub struct NewUserRole<'a> {
    pub user_id: Uuid,
    pub role: &'a str,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = user_claims)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserClaim {
    pub user_id: Uuid,
    pub claim_type: String,
    pub claim_value: String,
}

/// Rôles applicatifs portés dans les access tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Moderator,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Moderator => "Moderator",
            Self::User => "User",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "moderator" => Ok(Self::Moderator),
            "user" => Ok(Self::User),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Claim requis pour téléverser des médias
pub const CAN_UPLOAD_VIDEOS: &str = "CanUploadVideos";

/// Compte à créer avec ses rôles, claims et éventuel login externe,
/// écrit en une seule transaction.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub user: NewUser,
    pub roles: Vec<Role>,
    pub claims: Vec<(String, String)>,
    pub external_login: Option<ExternalLogin>,
}

impl NewAccount {
    /// Rôle `User` et droit d'upload, comme pour toute inscription
    pub fn with_defaults(user: NewUser) -> Self {
        Self {
            user,
            roles: vec![Role::User],
            claims: vec![(CAN_UPLOAD_VIDEOS.to_string(), "true".to_string())],
            external_login: None,
        }
    }

    pub fn linked_to(mut self, login: ExternalLogin) -> Self {
        self.external_login = Some(login);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalLogin {
    pub provider: String,
    pub provider_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!(" moderator ".parse::<Role>(), Ok(Role::Moderator));
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn defaults_grant_user_role_and_upload_claim() {
        let account = NewAccount::with_defaults(NewUser {
            email: "a@example.com".to_string(),
            username: "a".to_string(),
            password_hash: None,
            email_confirmed: false,
        });

        assert_eq!(account.roles, vec![Role::User]);
        assert_eq!(
            account.claims,
            vec![(CAN_UPLOAD_VIDEOS.to_string(), "true".to_string())]
        );
    }
}
