use crate::db::error::RepositoryError;
use crate::db::models::refresh_token::{NewRefreshToken, RefreshToken};
use crate::db::schema::refresh_tokens;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

pub struct RefreshTokenRepository;

impl RefreshTokenRepository {
    pub fn create(
        conn: &mut PgConnection,
        new_refresh_token: &NewRefreshToken,
    ) -> Result<RefreshToken, RepositoryError> {
        diesel::insert_into(refresh_tokens::table)
            .values(new_refresh_token)
            .returning(RefreshToken::as_returning())
            .get_result(conn)
            .map_err(Into::into)
    }

    /// Recherche exacte, révoqué ou expiré compris
    pub fn find_by_token(
        conn: &mut PgConnection,
        token: &str,
    ) -> Result<Option<RefreshToken>, RepositoryError> {
        refresh_tokens::table
            .filter(refresh_tokens::token.eq(token))
            .select(RefreshToken::as_select())
            .first(conn)
            .optional()
            .map_err(Into::into)
    }

    /// Révoque le token s'il ne l'est pas déjà. `false` si un autre appel l'a fait avant.
    pub fn revoke(
        conn: &mut PgConnection,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let updated = diesel::update(
            refresh_tokens::table
                .find(id)
                .filter(refresh_tokens::revoked_at.is_null()),
        )
        .set(refresh_tokens::revoked_at.eq(Some(at)))
        .execute(conn)?;
        Ok(updated == 1)
    }

    pub fn delete_expired(
        conn: &mut PgConnection,
        now: DateTime<Utc>,
    ) -> Result<usize, RepositoryError> {
        diesel::delete(refresh_tokens::table.filter(refresh_tokens::expires_at.le(now)))
            .execute(conn)
            .map_err(Into::into)
    }
}
