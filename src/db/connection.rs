use super::error::RepositoryError;
use super::{DbConnection, DbPool};
use anyhow::{Result, anyhow};
use diesel::PgConnection;
use diesel::r2d2::ConnectionManager;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use once_cell::sync::OnceCell;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

static DB_POOL: OnceCell<DbPool> = OnceCell::new();

/// Crée le pool global. Appelé une seule fois au démarrage.
pub fn init_pool(database_url: &str, max_size: u32) -> Result<()> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);

    let pool = diesel::r2d2::Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|e| anyhow!("Failed to create database pool: {e}"))?;

    DB_POOL
        .set(pool)
        .map_err(|_| anyhow!("Database pool already initialised"))
}

pub fn get_connection() -> Result<DbConnection, RepositoryError> {
    DB_POOL
        .get()
        .ok_or_else(|| RepositoryError::PoolError("Database pool not initialised".to_string()))?
        .get()
        .map_err(RepositoryError::from)
}

/// Applique les migrations embarquées qui n'ont pas encore tourné
pub fn run_migrations() -> Result<()> {
    let mut conn = get_connection()?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow!("Failed to run migrations: {e}"))?;

    for version in &applied {
        tracing::info!(%version, "Applied migration");
    }
    Ok(())
}

/// Prépare le pool de test. Retourne `false` quand `DATABASE_URL` est absent :
/// les tests Postgres s'arrêtent alors sans rien vérifier.
#[cfg(test)]
pub fn init_test_pool() -> bool {
    static READY: OnceCell<()> = OnceCell::new();

    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres test");
        return false;
    };
    // Un seul thread crée le pool et applique les migrations
    READY.get_or_init(|| {
        init_pool(&database_url, 5).expect("test pool");
        run_migrations().expect("migrations");
    });
    true
}
