//! # Sync Tuning
//!
//! Knobs for the fetch orchestrator. Dispatch pacing applies regardless of
//! worker availability so repeated syncs stay under upstream rate limits.

use std::time::Duration;

/// Tuning for a sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTuning {
    /// Maximum number of page requests in flight at once.
    pub workers: usize,
    /// Minimum interval between dispatching two page requests.
    pub dispatch_interval: Duration,
    /// Per-request timeout. A timed-out page degrades to an empty result.
    pub request_timeout: Duration,
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            workers: 8,
            dispatch_interval: Duration::from_millis(110),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl SyncTuning {
    /// Half the parallelism, slower pacing. For shared or flaky links.
    pub fn polite() -> Self {
        Self {
            workers: 4,
            dispatch_interval: Duration::from_millis(250),
            ..Self::default()
        }
    }

    /// Pacing suited to immediate local sources, e.g. tests against stubs.
    pub fn unpaced() -> Self {
        Self {
            dispatch_interval: Duration::from_millis(0),
            ..Self::default()
        }
    }
}
