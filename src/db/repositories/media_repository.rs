use crate::db::error::RepositoryError;
use crate::db::models::media::{Media, NewMedia};
use crate::db::schema::media;
use diesel::prelude::*;
use uuid::Uuid;

pub struct MediaRepository;

impl MediaRepository {
    pub fn create(conn: &mut PgConnection, new_media: &NewMedia) -> Result<Media, RepositoryError> {
        diesel::insert_into(media::table)
            .values(new_media)
            .returning(Media::as_returning())
            .get_result(conn)
            .map_err(Into::into)
    }

    pub fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Media>, RepositoryError> {
        media::table
            .find(id)
            .select(Media::as_select())
            .first(conn)
            .optional()
            .map_err(Into::into)
    }

    /// Médias d'un utilisateur, les plus récents d'abord
    pub fn for_user(conn: &mut PgConnection, user_id: Uuid) -> Result<Vec<Media>, RepositoryError> {
        media::table
            .filter(media::user_id.eq(user_id))
            .order(media::uploaded_at.desc())
            .select(Media::as_select())
            .load(conn)
            .map_err(Into::into)
    }

    pub fn delete(conn: &mut PgConnection, id: Uuid) -> Result<bool, RepositoryError> {
        let deleted = diesel::delete(media::table.find(id)).execute(conn)?;
        Ok(deleted == 1)
    }

    /// Supprime tous les médias de l'utilisateur et renvoie leurs identifiants
    pub fn delete_for_user(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Vec<Uuid>, RepositoryError> {
        diesel::delete(media::table.filter(media::user_id.eq(user_id)))
            .returning(media::id)
            .get_results(conn)
            .map_err(Into::into)
    }
}
