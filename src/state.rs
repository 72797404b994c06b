//! Shared counters and start timestamp, read across tasks without locks.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// `sent-requests` and `concurrent-scenarios` from spec §3, plus the
/// simulation's start time. Created once per `run`/`run_scenarios` call and
/// shared (via `Arc`) by every scenario pipeline, user loop, and executor it
/// spawns.
///
/// Writers: [`crate::user_loop`] (`concurrent_scenarios`) and
/// [`crate::executor`] (`sent_requests`). Readers (the runner, the shaper)
/// tolerate staleness — their bounds checks are conservative by design.
pub struct SharedState {
    pub start_time: Instant,
    sent_requests: AtomicU64,
    concurrent_scenarios: AtomicI64,
}

impl SharedState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            sent_requests: AtomicU64::new(0),
            concurrent_scenarios: AtomicI64::new(0),
        })
    }

    /// Increment at step dispatch, before the timeout race begins, per spec
    /// §5's note that this makes the runner's stopping condition
    /// conservative (it may over-count vs. completed requests).
    pub fn record_request_sent(&self) -> u64 {
        self.sent_requests.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn sent_requests(&self) -> u64 {
        self.sent_requests.load(Ordering::Relaxed)
    }

    pub fn scenario_started(&self) {
        self.concurrent_scenarios.fetch_add(1, Ordering::Relaxed);
    }

    pub fn scenario_finished(&self) {
        self.concurrent_scenarios.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn concurrent_scenarios(&self) -> i64 {
        self.concurrent_scenarios.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let state = SharedState::new();
        assert_eq!(state.sent_requests(), 0);
        assert_eq!(state.concurrent_scenarios(), 0);
    }

    #[test]
    fn scenario_started_and_finished_balance() {
        let state = SharedState::new();
        state.scenario_started();
        state.scenario_started();
        assert_eq!(state.concurrent_scenarios(), 2);
        state.scenario_finished();
        assert_eq!(state.concurrent_scenarios(), 1);
    }

    #[test]
    fn record_request_sent_increments_and_returns_new_value() {
        let state = SharedState::new();
        assert_eq!(state.record_request_sent(), 1);
        assert_eq!(state.record_request_sent(), 2);
        assert_eq!(state.sent_requests(), 2);
    }
}
