use crate::db::schema::user_identities;
use diesel::Insertable;
use uuid::Uuid;

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = user_identities)]
pub struct NewUserIdentity<'a> {
    pub provider: &'a str,
    pub provider_key: &'a str,
    pub user_id: Uuid,
}
