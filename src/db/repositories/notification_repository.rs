use crate::db::error::RepositoryError;
use crate::db::models::plan_notification::{NewPlanNotification, NotificationType};
use crate::db::schema::plan_notifications;
use chrono::{DateTime, Utc};
use diesel::dsl::exists;
use diesel::prelude::*;
use uuid::Uuid;

pub struct NotificationRepository;

impl NotificationRepository {
    /// Insère la ligne du registre. `false` si elle existait déjà.
    pub fn claim(
        conn: &mut PgConnection,
        notification: &NewPlanNotification,
    ) -> Result<bool, RepositoryError> {
        let inserted = diesel::insert_into(plan_notifications::table)
            .values(notification)
            .on_conflict((
                plan_notifications::user_id,
                plan_notifications::notification_type,
                plan_notifications::expiration_check_date,
            ))
            .do_nothing()
            .execute(conn)?;
        Ok(inserted == 1)
    }

    pub fn release(
        conn: &mut PgConnection,
        user_id: Uuid,
        kind: NotificationType,
        expiration_check_date: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        diesel::delete(
            plan_notifications::table
                .filter(plan_notifications::user_id.eq(user_id))
                .filter(plan_notifications::notification_type.eq(kind.as_str()))
                .filter(plan_notifications::expiration_check_date.eq(expiration_check_date)),
        )
        .execute(conn)?;
        Ok(())
    }

    pub fn exists(
        conn: &mut PgConnection,
        user_id: Uuid,
        kind: NotificationType,
        expiration_check_date: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        diesel::select(exists(
            plan_notifications::table
                .filter(plan_notifications::user_id.eq(user_id))
                .filter(plan_notifications::notification_type.eq(kind.as_str()))
                .filter(plan_notifications::expiration_check_date.eq(expiration_check_date)),
        ))
        .get_result(conn)
        .map_err(Into::into)
    }
}
