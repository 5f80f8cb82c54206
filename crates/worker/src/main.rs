//! Background worker
//!
//! Scheduled jobs:
//! - Stuck-pending subscription sweep (hourly): webhooks normally finalize
//!   pending rows within seconds, so anything pending for hours needs eyes.
//! - Stuck webhook audit row sweep (every 15 minutes): rows claimed as
//!   `processing` past the timeout get marked for re-delivery to pick up.
//! - Audit row retention cleanup (daily at 3:00 AM UTC).

use std::time::Duration;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use uuid::Uuid;

use coursebundle_shared::create_pool;

/// Pending rows older than this are considered stuck
const PENDING_THRESHOLD_HOURS: i32 = 6;

/// Claimed webhook audit rows older than this are considered abandoned
const PROCESSING_TIMEOUT_MINUTES: i32 = 30;

/// Audit rows are kept this long
const AUDIT_RETENTION_DAYS: i32 = 90;

async fn sweep_stuck_pending(pool: &PgPool) {
    let result: Result<Vec<(i64, Uuid, i64, String, time::OffsetDateTime)>, sqlx::Error> =
        sqlx::query_as(
            r#"
            SELECT id, user_id, bundle_id, stripe_reference, created_at
            FROM subscriptions
            WHERE payment_status = 'pending'
              AND created_at < NOW() - ($1 || ' hours')::INTERVAL
            ORDER BY created_at
            LIMIT 100
            "#,
        )
        .bind(PENDING_THRESHOLD_HOURS)
        .fetch_all(pool)
        .await;

    let stuck = match result {
        Ok(rows) => rows,
        Err(e) => {
            error!(error = %e, "Stuck pending subscription sweep query failed");
            return;
        }
    };

    if stuck.is_empty() {
        info!("No stuck pending subscriptions");
        return;
    }

    warn!(count = stuck.len(), "Found stuck pending subscriptions");

    for (id, user_id, bundle_id, stripe_reference, created_at) in stuck {
        warn!(
            subscription_id = id,
            user_id = %user_id,
            bundle_id = bundle_id,
            stripe_reference = %stripe_reference,
            created_at = %created_at,
            "Subscription stuck in pending, needs manual reconciliation"
        );
    }
}

async fn sweep_stuck_webhook_rows(pool: &PgPool) {
    let result = sqlx::query(
        r#"
        UPDATE stripe_webhook_events
        SET processing_result = 'error',
            error_message = 'abandoned: processing timed out'
        WHERE processing_result = 'processing'
          AND processing_started_at < NOW() - ($1 || ' minutes')::INTERVAL
        "#,
    )
    .bind(PROCESSING_TIMEOUT_MINUTES)
    .execute(pool)
    .await;

    match result {
        Ok(r) if r.rows_affected() > 0 => {
            warn!(
                count = r.rows_affected(),
                "Marked abandoned webhook audit rows as errored"
            );
        }
        Ok(_) => {}
        Err(e) => error!(error = %e, "Failed to sweep stuck webhook rows"),
    }
}

async fn cleanup_old_audit_rows(pool: &PgPool) {
    let result = sqlx::query(
        r#"
        DELETE FROM stripe_webhook_events
        WHERE created_at < NOW() - ($1 || ' days')::INTERVAL
        "#,
    )
    .bind(AUDIT_RETENTION_DAYS)
    .execute(pool)
    .await;

    match result {
        Ok(r) => info!(deleted = r.rows_affected(), "Webhook audit cleanup complete"),
        Err(e) => error!(error = %e, "Webhook audit cleanup failed"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    dotenvy::dotenv().ok();

    info!("Starting background worker");

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
    let pool = create_pool(&database_url).await?;
    info!("Database pool created");

    let scheduler = JobScheduler::new().await?;

    // Job 1: Stuck pending subscription sweep (hourly)
    let pending_pool = pool.clone();
    scheduler
        .add(Job::new_async("0 0 * * * *", move |_uuid, _l| {
            let pool = pending_pool.clone();
            Box::pin(async move {
                info!("Running stuck pending subscription sweep");
                sweep_stuck_pending(&pool).await;
            })
        })?)
        .await?;
    info!("Scheduled: Stuck pending subscription sweep (hourly)");

    // Job 2: Stuck webhook audit row sweep (every 15 minutes)
    let webhook_pool = pool.clone();
    scheduler
        .add(Job::new_async("0 */15 * * * *", move |_uuid, _l| {
            let pool = webhook_pool.clone();
            Box::pin(async move {
                sweep_stuck_webhook_rows(&pool).await;
            })
        })?)
        .await?;
    info!("Scheduled: Stuck webhook audit sweep (every 15 minutes)");

    // Job 3: Audit row retention cleanup (daily at 3:00 AM UTC)
    let cleanup_pool = pool.clone();
    scheduler
        .add(Job::new_async("0 0 3 * * *", move |_uuid, _l| {
            let pool = cleanup_pool.clone();
            Box::pin(async move {
                info!("Running webhook audit cleanup");
                cleanup_old_audit_rows(&pool).await;
            })
        })?)
        .await?;
    info!("Scheduled: Webhook audit cleanup (daily at 3:00 AM UTC)");

    info!("Starting job scheduler");
    scheduler.start().await?;

    info!("Worker started with 3 scheduled jobs");

    // The scheduler runs jobs in background tasks
    loop {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn unreachable_pool() -> PgPool {
        PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://nobody@127.0.0.1:1/unused")
            .unwrap()
    }

    #[tokio::test]
    async fn sweeps_survive_database_failures() {
        // A failed query must be reported and swallowed, never panic the
        // worker loop.
        let pool = unreachable_pool();
        sweep_stuck_pending(&pool).await;
        sweep_stuck_webhook_rows(&pool).await;
        cleanup_old_audit_rows(&pool).await;
    }
}
