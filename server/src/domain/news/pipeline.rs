//! Orchestrator: the long-running pipeline loop and its manual triggers
//!
//! Per cycle: refresh universe, collect, analyze with budget
//! `collected + slack`, archive every Nth cycle, publish status, then
//! sleep the market-aware cadence in 1-second ticks so a stop signal
//! interrupts within a second.
//!
//! One `running` flag guards the collect/analyze/archive phases across
//! the loop and all three HTTP triggers (acquire-or-reject). Phase
//! errors are logged with the cycle number and the loop continues; a
//! panicking phase is unrecoverable and stops the daemon cleanly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{Local, Timelike, Utc};
use futures::FutureExt;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::core::config::PipelineConfig;
use crate::core::constants::{
    ANALYZE_TRIGGER_BUDGET, ANALYZER_BUDGET_SLACK, ARCHIVE_EVERY_N_CYCLES, ARCHIVER_BUDGET,
    MARKET_CLOSE_HOUR, MARKET_OPEN_HOUR,
};
use crate::data::store::UniverseSource;

use super::analyzer::NewsAnalyzer;
use super::archiver::NewsArchiver;
use super::collector::NewsCollector;
use super::status::{PipelineStatus, StatusSnapshot};

/// Rejection for overlapping trigger/loop phases
#[derive(Debug, Error)]
#[error("Pipeline already running")]
pub struct PipelineBusy;

/// Result of a collect + analyze pass
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectOutcome {
    pub collected: usize,
    pub analyzed: usize,
}

/// The news pipeline: components plus loop state
pub struct NewsPipeline {
    collector: NewsCollector,
    analyzer: NewsAnalyzer,
    archiver: NewsArchiver,
    universe: Arc<dyn UniverseSource>,
    status: Arc<PipelineStatus>,
    running: AtomicBool,
    market_interval: Duration,
    off_interval: Duration,
}

impl NewsPipeline {
    pub fn new(
        collector: NewsCollector,
        analyzer: NewsAnalyzer,
        archiver: NewsArchiver,
        universe: Arc<dyn UniverseSource>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            collector,
            analyzer,
            archiver,
            universe,
            status: Arc::new(PipelineStatus::new()),
            running: AtomicBool::new(false),
            market_interval: Duration::from_secs(config.market_interval_secs),
            off_interval: Duration::from_secs(config.off_interval_secs),
        }
    }

    /// Copy of the current status for the HTTP surface
    pub fn status(&self) -> StatusSnapshot {
        self.status.snapshot()
    }

    // ========================================================================
    // MANUAL TRIGGERS (HTTP)
    // ========================================================================

    /// Synchronous collect + analyze under the reentrancy guard
    pub async fn trigger_collect(&self) -> Result<CollectOutcome, PipelineBusy> {
        let _guard = self.try_acquire().ok_or(PipelineBusy)?;
        Ok(self.collect_and_analyze().await)
    }

    /// Analyzer only, with the manual-trigger budget
    pub async fn trigger_analyze(&self) -> Result<usize, PipelineBusy> {
        let _guard = self.try_acquire().ok_or(PipelineBusy)?;
        Ok(self.analyze_phase(ANALYZE_TRIGGER_BUDGET).await)
    }

    /// Archiver only
    pub async fn trigger_archive(&self) -> Result<usize, PipelineBusy> {
        let _guard = self.try_acquire().ok_or(PipelineBusy)?;
        Ok(self.archive_phase().await)
    }

    // ========================================================================
    // BACKGROUND LOOP
    // ========================================================================

    /// Start the pipeline daemon
    pub fn start(self: &Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        let pipeline = Arc::clone(self);

        tokio::spawn(async move {
            pipeline.status.update(|s| s.daemon_running = true);
            tracing::info!("News pipeline daemon started");

            let mut cycle: u64 = 0;
            while !*shutdown_rx.borrow() {
                cycle += 1;
                pipeline.status.update(|s| s.loop_cycle = cycle);

                if !pipeline.run_cycle(cycle).await {
                    break;
                }

                let interval = pipeline.cadence_interval(Local::now().hour());
                tracing::info!(
                    cycle,
                    interval_secs = interval.as_secs(),
                    "Cycle done, sleeping"
                );
                if !cooperative_sleep(&mut shutdown_rx, interval).await {
                    break;
                }
            }

            pipeline.status.update(|s| s.daemon_running = false);
            tracing::info!("News pipeline daemon stopped");
        })
    }

    /// Run one cycle; false means the daemon must stop (panicked phase)
    async fn run_cycle(&self, cycle: u64) -> bool {
        let phases = self
            .cycle_phases(cycle)
            .instrument(tracing::info_span!("cycle", cycle));

        match std::panic::AssertUnwindSafe(phases).catch_unwind().await {
            Ok(()) => true,
            Err(_) => {
                tracing::error!(cycle, "Non-recoverable error in cycle, stopping daemon");
                false
            }
        }
    }

    async fn cycle_phases(&self, cycle: u64) {
        match self.try_acquire() {
            Some(_guard) => {
                let outcome = self.collect_and_analyze().await;
                tracing::info!(
                    cycle,
                    collected = outcome.collected,
                    analyzed = outcome.analyzed,
                    "Collect/analyze finished"
                );
            }
            None => {
                // A manual trigger holds the guard; skip rather than
                // overlap so the cadence stays predictable
                tracing::info!(cycle, "Pipeline busy, skipping collect/analyze");
            }
        }

        if cycle % ARCHIVE_EVERY_N_CYCLES == 0 {
            let archived = self.archive_phase().await;
            tracing::info!(cycle, archived, "Archive finished");
        }
    }

    // ========================================================================
    // PHASES
    // ========================================================================

    /// Caller must hold the running guard
    async fn collect_and_analyze(&self) -> CollectOutcome {
        let universe = match self.universe.active().await {
            Ok(universe) => universe,
            Err(e) => {
                tracing::warn!(error = %e, "Universe refresh failed, using empty universe");
                Default::default()
            }
        };

        let collected = self.collector.run_once(&universe).await;
        self.status.update(|s| {
            s.last_collect = Some(Utc::now());
            s.last_collect_count = collected;
        });

        let analyzed = self.analyze_phase(collected + ANALYZER_BUDGET_SLACK).await;

        CollectOutcome {
            collected,
            analyzed,
        }
    }

    async fn analyze_phase(&self, budget: usize) -> usize {
        let analyzed = match self.analyzer.run_once(budget).await {
            Ok(analyzed) => analyzed,
            Err(e) => {
                tracing::warn!(error = %e, "Analyzer failed");
                0
            }
        };

        self.status.update(|s| {
            s.last_analyze = Some(Utc::now());
            s.last_analyze_count = analyzed;
        });
        analyzed
    }

    async fn archive_phase(&self) -> usize {
        match self.archiver.run_once(ARCHIVER_BUDGET).await {
            Ok(archived) => {
                self.status.update(|s| s.last_archive = Some(Utc::now()));
                archived
            }
            Err(e) => {
                tracing::warn!(error = %e, "Archiver failed");
                0
            }
        }
    }

    // ========================================================================
    // GUARD AND CADENCE
    // ========================================================================

    fn try_acquire(&self) -> Option<RunGuard<'_>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.status.update(|s| s.running = true);
            Some(RunGuard { pipeline: self })
        } else {
            None
        }
    }

    /// 10 minutes inside local market hours, 30 minutes outside
    fn cadence_interval(&self, local_hour: u32) -> Duration {
        if (MARKET_OPEN_HOUR..MARKET_CLOSE_HOUR).contains(&local_hour) {
            self.market_interval
        } else {
            self.off_interval
        }
    }
}

/// Releases the running flag on every exit path
struct RunGuard<'a> {
    pipeline: &'a NewsPipeline,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.pipeline.running.store(false, Ordering::SeqCst);
        self.pipeline.status.update(|s| s.running = false);
    }
}

/// Sleep `interval` in 1-second ticks, re-checking the shutdown flag on
/// each tick. Returns false as soon as shutdown is observed.
async fn cooperative_sleep(shutdown_rx: &mut watch::Receiver<bool>, interval: Duration) -> bool {
    let mut remaining = interval.as_secs();
    while remaining > 0 {
        if *shutdown_rx.borrow() {
            return false;
        }
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    return false;
                }
            }
            _ = tokio::time::sleep(Duration::from_secs(1)) => {
                remaining -= 1;
            }
        }
    }
    true
}
