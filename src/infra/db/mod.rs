//! Postgres-backed post store.

mod posts;

use sqlx::postgres::{PgPool, PgPoolOptions};

pub use posts::PostRow;

use crate::application::store::StoreError;

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }
}

pub(crate) fn map_read_error(err: sqlx::Error) -> StoreError {
    StoreError::unavailable(err.to_string())
}

pub(crate) fn map_write_error(err: sqlx::Error) -> StoreError {
    StoreError::write(err.to_string())
}
