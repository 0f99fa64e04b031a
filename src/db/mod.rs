use futures::future::BoxFuture;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use std::time::Duration;

use crate::config::Config;
use crate::error::AppError;

pub mod ledger;
pub mod lookups;
pub mod models;
pub mod pending;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn create_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Runs `f` as one unit of work: commits when it returns `Ok`, rolls back otherwise.
///
/// Store functions take `&mut PgConnection`, so everything `f` does goes through
/// the same transaction. The closure must own its inputs:
///
/// ```ignore
/// db::with_transaction(&pool, move |conn| Box::pin(async move {
///     pending::insert_top_up(conn, &top_up).await
/// }))
/// .await?;
/// ```
pub async fn with_transaction<T, F>(pool: &PgPool, f: F) -> Result<T, AppError>
where
    T: Send,
    F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, AppError>> + Send,
{
    let mut tx = pool.begin().await?;

    match f(&mut *tx).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(error = %rollback_err, "Failed to roll back transaction");
            }
            Err(err)
        }
    }
}
