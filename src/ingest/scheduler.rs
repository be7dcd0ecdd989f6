// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::ingest::Pipeline;

pub const DEFAULT_INTERVAL_SECS: u64 = 300;

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub interval: Duration,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
        }
    }
}

/// Run the pipeline once immediately, then on every interval tick.
/// A tick that lands while a cycle is still running is skipped.
pub fn spawn_scheduler(pipeline: Arc<Pipeline>, cfg: SchedulerCfg) -> JoinHandle<()> {
    tokio::spawn(async move {
        // First tick completes immediately: that is the start-up run.
        let mut ticker = tokio::time::interval(cfg.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(target: "ingest", interval_secs = cfg.interval.as_secs(), "ingest scheduler started");
        loop {
            ticker.tick().await;

            let pipeline = Arc::clone(&pipeline);
            // Detached; the pipeline gate rejects overlapping cycles.
            tokio::spawn(async move {
                match pipeline.try_run_cycle().await {
                    Some(report) => {
                        tracing::info!(
                            target: "ingest",
                            inserted = report.inserted,
                            failed = report.failed,
                            "scheduled ingest tick"
                        );
                    }
                    None => {
                        counter!("ingest_cycles_skipped_total").increment(1);
                        tracing::info!(target: "ingest", "previous cycle still running, skipping tick");
                    }
                }
            });
        }
    })
}
