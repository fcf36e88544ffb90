use crate::{context::AppContext, error::RegistryResult, metrics, repair};
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    /// One-off maintenance before the server starts taking requests
    pub async fn run_startup(&self) -> RegistryResult<()> {
        let jobs = &self.context.config.jobs;

        if jobs.canonicalize_on_start {
            info!("Canonicalizing legacy document keys");
            Self::canonicalize(&self.context).await?;
        }

        if jobs.repair_on_start {
            info!("Rebuilding mapping table from proxy records and metadata");
            Self::rebuild(&self.context).await?;
        }

        Ok(())
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        let period = self.context.config.jobs.repair_interval_secs;
        if period == 0 {
            info!("Periodic mapping repair disabled");
            return;
        }

        info!("Starting background job scheduler");
        tokio::spawn(Self::mapping_repair_job(Arc::clone(&self), period));
    }

    /// Rebuild the mapping table (runs every `repair_interval_secs`)
    async fn mapping_repair_job(scheduler: Arc<Self>, period: u64) {
        let mut interval = interval(Duration::from_secs(period));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; startup repair already covered it
        interval.tick().await;

        loop {
            interval.tick().await;
            info!("Running mapping repair");

            if let Err(e) = Self::rebuild(&scheduler.context).await {
                error!("Mapping repair failed: {}", e);
            }
        }
    }

    async fn rebuild(ctx: &AppContext) -> RegistryResult<repair::RepairReport> {
        match repair::rebuild_mapping(&ctx.store, &ctx.mapping).await {
            Ok(report) => {
                metrics::record_background_job("mapping_repair", "success");
                Ok(report)
            }
            Err(e) => {
                metrics::record_background_job("mapping_repair", "failure");
                Err(e)
            }
        }
    }

    async fn canonicalize(ctx: &AppContext) -> RegistryResult<repair::CanonicalizeReport> {
        match repair::canonicalize_store(&ctx.store, &ctx.mapping).await {
            Ok(report) => {
                metrics::record_background_job("canonicalize", "success");
                Ok(report)
            }
            Err(e) => {
                metrics::record_background_job("canonicalize", "failure");
                Err(e)
            }
        }
    }
}
