// /mp-checkout/services/checkout-service/src/utils/scheduler.rs

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio_cron_scheduler::{JobScheduler, Job};
use crate::{
    middleware::rate_limit::RateLimiter,
    utils::error::{AppError, AppResult},
};

// Scheduler metrics for monitoring
pub struct SchedulerMetrics {
    pub sweep_runs: AtomicU64,
    pub evicted_clients: AtomicU64,
    pub last_sweep: RwLock<Option<DateTime<Utc>>>,
}

impl SchedulerMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sweep_runs: AtomicU64::new(0),
            evicted_clients: AtomicU64::new(0),
            last_sweep: RwLock::new(None),
        })
    }

    pub async fn get_status(&self) -> serde_json::Value {
        let last_sweep = self.last_sweep.read().await;
        serde_json::json!({
            "sweep_runs": self.sweep_runs.load(Ordering::Relaxed),
            "evicted_clients": self.evicted_clients.load(Ordering::Relaxed),
            "last_sweep": *last_sweep,
        })
    }
}

/// Start background jobs untuk maintenance rate limiter
///
/// The returned scheduler must be kept alive by the caller.
pub async fn start_background_jobs(
    limiter: Arc<RateLimiter>,
    metrics: Arc<SchedulerMetrics>,
    sweep_cron: &str,
) -> AppResult<JobScheduler> {
    let scheduler = JobScheduler::new().await
        .map_err(|e| AppError::Configuration(format!("Failed to create scheduler: {}", e)))?;

    let sweep_job = Job::new_async(sweep_cron, move |_uuid, _l| {
        let limiter = limiter.clone();
        let metrics = metrics.clone();
        Box::pin(async move {
            let evicted = sweep_rate_limiter(&limiter, &metrics, Utc::now()).await;
            tracing::debug!("Rate limiter sweep completed, {} clients evicted", evicted);
        })
    })
    .map_err(|e| AppError::Configuration(format!("Failed to create sweep job '{}': {}", sweep_cron, e)))?;

    scheduler.add(sweep_job).await
        .map_err(|e| AppError::Configuration(format!("Failed to add sweep job: {}", e)))?;

    scheduler.start().await
        .map_err(|e| AppError::Configuration(format!("Failed to start scheduler: {}", e)))?;

    tracing::info!("✅ Background jobs scheduler started");
    Ok(scheduler)
}

/// Background job: drop stale rate limiter clients
pub async fn sweep_rate_limiter(
    limiter: &RateLimiter,
    metrics: &SchedulerMetrics,
    now: DateTime<Utc>,
) -> usize {
    let evicted = limiter.sweep(now).await;

    metrics.sweep_runs.fetch_add(1, Ordering::Relaxed);
    metrics.evicted_clients.fetch_add(evicted as u64, Ordering::Relaxed);
    *metrics.last_sweep.write().await = Some(now);

    if evicted > 0 {
        tracing::info!("Evicted {} stale rate limiter clients", evicted);
    }
    evicted
}
