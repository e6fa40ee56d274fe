use crate::db::schema::media;
use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable, Selectable};
use reelbox_api::MediaResponse;
use uuid::Uuid;

pub const STATUS_UPLOADED: &str = "Uploaded";

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = media)]
pub struct NewMedia {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub file_size: i64,
    pub status: String,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = media)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Media {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub file_size: i64,
    pub uploaded_at: DateTime<Utc>,
    pub status: String,
}

impl From<Media> for MediaResponse {
    fn from(media: Media) -> Self {
        MediaResponse {
            id: media.id,
            file_name: media.file_name,
            content_type: media.content_type,
            file_size: media.file_size,
            uploaded_at: media.uploaded_at,
            status: media.status,
        }
    }
}
