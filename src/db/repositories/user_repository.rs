use crate::db::error::RepositoryError;
use crate::db::models::user::{NewUser, NewUserRole, User, UserClaim};
use crate::db::schema::{user_claims, user_roles, users};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Uuid as SqlUuid};
use uuid::Uuid;

pub struct UserRepository;

impl UserRepository {
    pub fn find_by_email(
        conn: &mut PgConnection,
        email: &str,
    ) -> Result<Option<User>, RepositoryError> {
        users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first(conn)
            .optional()
            .map_err(Into::into)
    }

    /// Trouver un utilisateur par ID
    pub fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<User>, RepositoryError> {
        users::table
            .find(id)
            .select(User::as_select())
            .first(conn)
            .optional()
            .map_err(Into::into)
    }

    /// Créer un nouvel utilisateur
    pub fn create(conn: &mut PgConnection, new_user: &NewUser) -> Result<User, RepositoryError> {
        diesel::insert_into(users::table)
            .values(new_user)
            .returning(User::as_returning())
            .get_result(conn)
            .map_err(Into::into)
    }

    /// Supprimer un utilisateur (les lignes liées partent en cascade)
    pub fn delete(conn: &mut PgConnection, id: Uuid) -> Result<bool, RepositoryError> {
        let deleted = diesel::delete(users::table.find(id)).execute(conn)?;
        Ok(deleted == 1)
    }

    pub fn add_role(
        conn: &mut PgConnection,
        user_id: Uuid,
        role: &str,
    ) -> Result<(), RepositoryError> {
        diesel::insert_into(user_roles::table)
            .values(&NewUserRole { user_id, role })
            .on_conflict_do_nothing()
            .execute(conn)?;
        Ok(())
    }

    pub fn roles(conn: &mut PgConnection, user_id: Uuid) -> Result<Vec<String>, RepositoryError> {
        user_roles::table
            .filter(user_roles::user_id.eq(user_id))
            .select(user_roles::role)
            .order(user_roles::role.asc())
            .load(conn)
            .map_err(Into::into)
    }

    pub fn set_claim(conn: &mut PgConnection, claim: &UserClaim) -> Result<(), RepositoryError> {
        diesel::insert_into(user_claims::table)
            .values(claim)
            .on_conflict((user_claims::user_id, user_claims::claim_type))
            .do_update()
            .set(user_claims::claim_value.eq(&claim.claim_value))
            .execute(conn)?;
        Ok(())
    }

    pub fn claims(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Vec<UserClaim>, RepositoryError> {
        user_claims::table
            .filter(user_claims::user_id.eq(user_id))
            .select(UserClaim::as_select())
            .load(conn)
            .map_err(Into::into)
    }

    /// Affecte un plan: quota acheté et date d'expiration écrasés sans cumul
    pub fn set_plan(
        conn: &mut PgConnection,
        user_id: Uuid,
        plan_id: i32,
        purchased_bytes: i64,
        expiration: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let updated = diesel::update(users::table.find(user_id))
            .set((
                users::plan_id.eq(Some(plan_id)),
                users::purchased_memory_bytes.eq(Some(purchased_bytes)),
                users::plan_expiration.eq(Some(expiration)),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;
        if updated == 0 {
            return Err(RepositoryError::NotFound(format!("User {user_id}")));
        }
        Ok(())
    }

    /// Retire le plan sans toucher à la date d'expiration,
    /// le balayage d'expiration en a encore besoin pour purger.
    pub fn unassign_plan(conn: &mut PgConnection, user_id: Uuid) -> Result<(), RepositoryError> {
        diesel::update(users::table.find(user_id))
            .set((
                users::plan_id.eq(None::<i32>),
                users::purchased_memory_bytes.eq(None::<i64>),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;
        Ok(())
    }

    /// Remise à zéro complète après purge des médias
    pub fn clear_plan(conn: &mut PgConnection, user_id: Uuid) -> Result<(), RepositoryError> {
        diesel::update(users::table.find(user_id))
            .set((
                users::plan_id.eq(None::<i32>),
                users::purchased_memory_bytes.eq(None::<i64>),
                users::plan_expiration.eq(None::<DateTime<Utc>>),
                users::used_memory_bytes.eq(0_i64),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;
        Ok(())
    }

    pub fn with_plan_expiration(conn: &mut PgConnection) -> Result<Vec<User>, RepositoryError> {
        users::table
            .filter(users::plan_expiration.is_not_null())
            .select(User::as_select())
            .load(conn)
            .map_err(Into::into)
    }

    /// Réserve `bytes` seulement si le quota acheté le permet.
    /// Une seule requête conditionnelle: deux uploads concurrents ne peuvent
    /// pas dépasser ensemble la limite.
    pub fn try_increase_used_memory(
        conn: &mut PgConnection,
        user_id: Uuid,
        bytes: i64,
    ) -> Result<bool, RepositoryError> {
        let updated = diesel::update(
            users::table
                .find(user_id)
                .filter(users::purchased_memory_bytes.is_not_null())
                .filter(
                    (users::used_memory_bytes + bytes)
                        .le(users::purchased_memory_bytes.assume_not_null()),
                ),
        )
        .set((
            users::used_memory_bytes.eq(users::used_memory_bytes + bytes),
            users::updated_at.eq(Utc::now()),
        ))
        .execute(conn)?;
        Ok(updated == 1)
    }

    pub fn decrease_used_memory(
        conn: &mut PgConnection,
        user_id: Uuid,
        bytes: i64,
    ) -> Result<(), RepositoryError> {
        diesel::sql_query(
            "UPDATE users SET used_memory_bytes = GREATEST(used_memory_bytes - $1, 0), \
             updated_at = NOW() WHERE id = $2",
        )
        .bind::<BigInt, _>(bytes)
        .bind::<SqlUuid, _>(user_id)
        .execute(conn)?;
        Ok(())
    }
}
