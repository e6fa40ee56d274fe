//! Tâches périodiques: purge des refresh tokens et balayage des plans.

pub mod token_cleanup;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait ScheduledTask: Send + Sync {
    fn name(&self) -> &'static str;

    fn interval(&self) -> Duration;

    /// One iteration. Errors are logged by the runner, never propagated.
    async fn run_once(&self) -> anyhow::Result<()>;
}

/// Lance la tâche en arrière-plan jusqu'à l'annulation du token.
/// La première itération a lieu immédiatement.
pub fn spawn(task: Arc<dyn ScheduledTask>, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let name = task.name();
        let mut tick = tokio::time::interval(task.interval());
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(
            task = name,
            interval_secs = task.interval().as_secs(),
            "Scheduled task started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tick.tick() => {}
            }

            if let Err(e) = task.run_once().await {
                tracing::error!(task = name, error = %e, "Scheduled task iteration failed");
            }
        }

        tracing::info!(task = name, "Scheduled task stopped");
    })
}
