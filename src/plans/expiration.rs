//! Plan expiration sweep.
//!
//! For every user carrying a `plan_expiration`:
//! - expiring within 24h: one warning email
//! - expired for less than 3 days: one final notice
//! - expired for 3 days or more: media purged, plan cleared, one last email
//!
//! Each email is guarded by a row in the notification ledger, claimed before
//! sending and released if the send fails, so concurrent or repeated sweeps
//! send each kind at most once per expiration date.

use super::notifications::NotificationTemplates;
use crate::db::models::plan_notification::{NewPlanNotification, NotificationType};
use crate::db::models::user::User;
use crate::db::store::Store;
use crate::email::EmailSender;
use crate::storage::ObjectStorage;
use crate::tasks::ScheduledTask;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

const WARNING_WINDOW_DAYS: i64 = 1;
const GRACE_PERIOD_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirationPhase {
    Active,
    ExpiringSoon,
    InGracePeriod,
    Purgeable,
}

pub fn phase(expiration: DateTime<Utc>, now: DateTime<Utc>) -> ExpirationPhase {
    if expiration > now {
        if expiration <= now + Duration::days(WARNING_WINDOW_DAYS) {
            ExpirationPhase::ExpiringSoon
        } else {
            ExpirationPhase::Active
        }
    } else if now - expiration >= Duration::days(GRACE_PERIOD_DAYS) {
        ExpirationPhase::Purgeable
    } else {
        ExpirationPhase::InGracePeriod
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub warnings_sent: usize,
    pub final_notices_sent: usize,
    pub purged_users: usize,
    pub media_deleted: usize,
    pub failures: usize,
}

pub struct ExpirationSweep {
    store: Arc<dyn Store>,
    storage: Arc<dyn ObjectStorage>,
    mailer: Arc<dyn EmailSender>,
    templates: NotificationTemplates,
    interval: std::time::Duration,
}

impl ExpirationSweep {
    pub fn new(
        store: Arc<dyn Store>,
        storage: Arc<dyn ObjectStorage>,
        mailer: Arc<dyn EmailSender>,
        templates: NotificationTemplates,
        interval: std::time::Duration,
    ) -> Self {
        Self {
            store,
            storage,
            mailer,
            templates,
            interval,
        }
    }

    pub async fn sweep(&self, now: DateTime<Utc>) -> anyhow::Result<SweepReport> {
        let users = self.store.users_with_plan_expiration()?;
        let mut report = SweepReport::default();

        for user in users {
            let Some(expiration) = user.plan_expiration else {
                continue;
            };

            let outcome = match phase(expiration, now) {
                ExpirationPhase::Active => Ok(()),
                ExpirationPhase::ExpiringSoon => self
                    .notify(&user, NotificationType::ExpiringIn1Day, expiration, now)
                    .await
                    .map(|sent| report.warnings_sent += usize::from(sent)),
                ExpirationPhase::InGracePeriod => self
                    .final_notice(&user, expiration, now)
                    .await
                    .map(|sent| report.final_notices_sent += usize::from(sent)),
                ExpirationPhase::Purgeable => self.purge(&user, expiration, now, &mut report).await,
            };

            if let Err(e) = outcome {
                report.failures += 1;
                tracing::error!(
                    user_id = %user.id,
                    %expiration,
                    error = %e,
                    "Plan expiration handling failed"
                );
            }
        }

        Ok(report)
    }

    async fn final_notice(
        &self,
        user: &User,
        expiration: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        if self
            .store
            .has_notification(user.id, NotificationType::Expired, expiration)?
        {
            return Ok(false);
        }
        self.notify(user, NotificationType::ExpiringIn3Days, expiration, now)
            .await
    }

    async fn purge(
        &self,
        user: &User,
        expiration: DateTime<Utc>,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> anyhow::Result<()> {
        let Some(media_ids) = self.store.purge_expired_plan(user.id, expiration, now)? else {
            return Ok(());
        };

        report.purged_users += 1;
        report.media_deleted += media_ids.len();
        tracing::info!(user_id = %user.id, media = media_ids.len(), "Expired plan purged");

        for id in &media_ids {
            if let Err(e) = self.storage.delete(&id.to_string()).await {
                tracing::warn!(
                    user_id = %user.id,
                    media_id = %id,
                    error = %e,
                    "Stored object not deleted"
                );
            }
        }

        // Le ledger est déjà écrit par la purge: pas de nouvel essai possible
        let message = self
            .templates
            .render(NotificationType::Expired, &user.email, &user.username);
        self.mailer.send(&message).await?;
        Ok(())
    }

    /// Réclame l'entrée du ledger puis envoie. `false` si déjà envoyé.
    async fn notify(
        &self,
        user: &User,
        kind: NotificationType,
        expiration: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let claim = NewPlanNotification::new(user.id, kind, expiration, now);
        if !self.store.claim_notification(&claim)? {
            return Ok(false);
        }

        let message = self.templates.render(kind, &user.email, &user.username);
        if let Err(e) = self.mailer.send(&message).await {
            if let Err(release) = self.store.release_notification(user.id, kind, expiration) {
                tracing::error!(
                    user_id = %user.id,
                    kind = kind.as_str(),
                    error = %release,
                    "Notification claim not released"
                );
            }
            return Err(e.into());
        }

        tracing::info!(user_id = %user.id, kind = kind.as_str(), "Plan notification sent");
        Ok(true)
    }
}

#[async_trait]
impl ScheduledTask for ExpirationSweep {
    fn name(&self) -> &'static str {
        "plan-expiration"
    }

    fn interval(&self) -> std::time::Duration {
        self.interval
    }

    async fn run_once(&self) -> anyhow::Result<()> {
        let report = self.sweep(Utc::now()).await?;
        tracing::info!(
            warnings = report.warnings_sent,
            final_notices = report.final_notices_sent,
            purged_users = report.purged_users,
            media_deleted = report.media_deleted,
            failures = report.failures,
            "Plan expiration sweep finished"
        );
        Ok(())
    }
}
