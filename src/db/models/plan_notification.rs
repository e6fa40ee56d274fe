use crate::db::schema::plan_notifications;
use chrono::{DateTime, Utc};
use diesel::Insertable;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationType {
    ExpiringIn1Day,
    ExpiringIn3Days,
    Expired,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExpiringIn1Day => "ExpiringIn1Day",
            Self::ExpiringIn3Days => "ExpiringIn3Days",
            Self::Expired => "Expired",
        }
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = plan_notifications)]
pub struct NewPlanNotification {
    pub user_id: Uuid,
    pub notification_type: String,
    pub sent_at: DateTime<Utc>,
    pub expiration_check_date: DateTime<Utc>,
}

impl NewPlanNotification {
    pub fn new(
        user_id: Uuid,
        kind: NotificationType,
        expiration_check_date: DateTime<Utc>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            notification_type: kind.as_str().to_string(),
            sent_at,
            expiration_check_date,
        }
    }
}
