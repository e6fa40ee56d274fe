use super::ScheduledTask;
use crate::auth::tokens::TokenService;
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;

/// Supprime définitivement les refresh tokens expirés
pub struct TokenCleanupTask {
    tokens: TokenService,
    interval: Duration,
}

impl TokenCleanupTask {
    pub fn new(tokens: TokenService, interval: Duration) -> Self {
        Self { tokens, interval }
    }
}

#[async_trait]
impl ScheduledTask for TokenCleanupTask {
    fn name(&self) -> &'static str {
        "token-cleanup"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run_once(&self) -> anyhow::Result<()> {
        let deleted = self.tokens.purge_expired(Utc::now())?;
        tracing::info!(deleted, "Expired refresh tokens purged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::refresh_token::NewRefreshToken;
    use crate::db::store::RefreshTokenStore;
    use crate::testing::{MemoryStore, test_jwt, test_user};
    use std::sync::Arc;

    #[tokio::test]
    async fn removes_only_expired_tokens() {
        let store = Arc::new(MemoryStore::default());
        let user = test_user(&store, "cleanup@example.com");
        let tokens = TokenService::new(store.clone(), test_jwt(), 1);
        let live = tokens.issue_refresh_token(user.id).unwrap();
        store
            .insert_refresh_token(&NewRefreshToken {
                user_id: user.id,
                token: "stale".to_string(),
                expires_at: Utc::now() - chrono::Duration::minutes(1),
            })
            .unwrap();

        TokenCleanupTask::new(tokens, Duration::from_secs(60))
            .run_once()
            .await
            .unwrap();

        assert!(store.find_refresh_token("stale").unwrap().is_none());
        assert!(store.find_refresh_token(&live.token).unwrap().is_some());
    }
}
