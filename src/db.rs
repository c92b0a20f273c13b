use std::{future::Future, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::config::DatabaseConfig;

pub fn pool_options(cfg: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .min_connections(cfg.min_connections.min(cfg.max_connections))
        .acquire_timeout(cfg.connect_timeout)
        .idle_timeout(cfg.idle_timeout)
        .max_lifetime(cfg.max_lifetime)
}

/// Runs `op` up to `attempts` times (at least once), sleeping `delay` between failures.
pub async fn retry_fixed<F, Fut, T, E>(attempts: u32, delay: Duration, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                warn!(attempt, attempts, error = %e, "attempt failed; retrying in {:?}", delay);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Connects the pool and pings it, retrying on failure.
pub async fn connect_with_retry(cfg: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let options = cfg.connect_options()?;
    let pool = retry_fixed(cfg.connect_retries, cfg.connect_retry_delay, || {
        let options = options.clone();
        async move {
            let pool = pool_options(cfg).connect_with(options).await?;
            sqlx::query("SELECT 1").execute(&pool).await?;
            Ok::<_, sqlx::Error>(pool)
        }
    })
    .await
    .with_context(|| format!("connect to database after {} attempts", cfg.connect_retries.max(1)))?;

    info!(
        max_connections = cfg.max_connections,
        min_connections = cfg.min_connections,
        "database connected"
    );
    Ok(pool)
}

pub async fn run_migrations(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")
}
