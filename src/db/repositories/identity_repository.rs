use crate::db::error::RepositoryError;
use crate::db::models::identity::NewUserIdentity;
use crate::db::models::user::User;
use crate::db::schema::{user_identities, users};
use diesel::prelude::*;

pub struct IdentityRepository;

impl IdentityRepository {
    /// Utilisateur déjà lié à ce couple (provider, clé)
    pub fn find_user_by_login(
        conn: &mut PgConnection,
        provider: &str,
        provider_key: &str,
    ) -> Result<Option<User>, RepositoryError> {
        user_identities::table
            .inner_join(users::table)
            .filter(user_identities::provider.eq(provider))
            .filter(user_identities::provider_key.eq(provider_key))
            .select(User::as_select())
            .first(conn)
            .optional()
            .map_err(Into::into)
    }

    pub fn link(
        conn: &mut PgConnection,
        identity: &NewUserIdentity<'_>,
    ) -> Result<(), RepositoryError> {
        diesel::insert_into(user_identities::table)
            .values(identity)
            .execute(conn)?;
        Ok(())
    }
}
