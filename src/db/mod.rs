pub mod connection;
pub mod error;
pub mod models;
pub mod pg_store;
pub mod repositories;
pub mod schema;
pub mod store;

use diesel::PgConnection;
use diesel::r2d2::{self, ConnectionManager};

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;
