//! Pipeline status snapshot
//!
//! Single-owner mutable state: the orchestrator (and the trigger paths
//! it guards) writes through `update`; everyone else copies a snapshot.
//! HTTP handlers never mutate.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use utoipa::ToSchema;

/// Point-in-time pipeline state, copied out to readers
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct StatusSnapshot {
    pub last_collect: Option<DateTime<Utc>>,
    pub last_analyze: Option<DateTime<Utc>>,
    pub last_archive: Option<DateTime<Utc>>,
    pub last_collect_count: usize,
    pub last_analyze_count: usize,
    pub loop_cycle: u64,
    /// A collect/analyze/archive phase is currently executing
    pub running: bool,
    /// The background loop is alive
    pub daemon_running: bool,
}

/// Lock-guarded status owned by the orchestrator
#[derive(Default)]
pub struct PipelineStatus {
    inner: RwLock<StatusSnapshot>,
}

impl PipelineStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the current state
    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner.read().clone()
    }

    /// Mutate under the write lock (orchestrator only)
    pub(crate) fn update(&self, f: impl FnOnce(&mut StatusSnapshot)) {
        f(&mut self.inner.write());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_is_a_copy() {
        let status = PipelineStatus::new();
        status.update(|s| {
            s.loop_cycle = 3;
            s.last_collect_count = 7;
        });

        let snapshot = status.snapshot();
        assert_eq!(snapshot.loop_cycle, 3);
        assert_eq!(snapshot.last_collect_count, 7);

        // Later writes do not affect the copy
        status.update(|s| s.loop_cycle = 4);
        assert_eq!(snapshot.loop_cycle, 3);
        assert_eq!(status.snapshot().loop_cycle, 4);
    }
}
