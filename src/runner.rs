//! Stopping-condition objects shared by every virtual user in a simulation.
//!
//! A [`Runner`] answers two questions cheaply and without I/O: should the
//! engine keep going, and how far through its budget is it. Both questions
//! are asked from hot loops (the user loop, the shaper's ramp ticker), so
//! implementations read plain atomics rather than perform any work.

use std::time::{Duration, Instant};

/// Polymorphic stopping condition. See spec §4.1.
pub trait Runner: Send + Sync {
    /// Whether another scenario walk may start.
    fn continue_(&self, sent: u64, start_time: Instant) -> bool;

    /// How far through the runner's budget we are, clamped to `[0, 1]`.
    fn progress(&self, sent: u64, start_time: Instant) -> f64;

    fn info(&self) -> String;
}

/// Stops once `duration` has elapsed since `start_time`.
pub struct DurationRunner {
    pub duration: Duration,
}

impl DurationRunner {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl Runner for DurationRunner {
    fn continue_(&self, _sent: u64, start_time: Instant) -> bool {
        start_time.elapsed() < self.duration
    }

    fn progress(&self, _sent: u64, start_time: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (start_time.elapsed().as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    fn info(&self) -> String {
        format!("DurationRunner({:?})", self.duration)
    }
}

/// Stops once `sent` requests have been dispatched.
pub struct RequestCountRunner {
    pub requests: u64,
}

impl RequestCountRunner {
    pub fn new(requests: u64) -> Self {
        Self { requests }
    }
}

impl Runner for RequestCountRunner {
    fn continue_(&self, sent: u64, _start_time: Instant) -> bool {
        sent < self.requests
    }

    fn progress(&self, sent: u64, _start_time: Instant) -> f64 {
        if self.requests == 0 {
            return 1.0;
        }
        (sent as f64 / self.requests as f64).clamp(0.0, 1.0)
    }

    fn info(&self) -> String {
        format!("RequestCountRunner({})", self.requests)
    }
}

/// Neither a duration nor a request count was given: each of the
/// `user_count` configured users runs the scenario exactly once, then the
/// engine stops (spec §9's Open Question, resolved in that direction).
///
/// Reuses the `sent` counter the other runners read rather than a separate
/// "iterations" counter — spec's Shared State has no such counter, and
/// `sent` already increments once per step dispatch, so for a single-step
/// scenario it coincides with "walks started".
pub struct FixedUserRunner {
    pub user_count: u64,
}

impl FixedUserRunner {
    pub fn new(user_count: u64) -> Self {
        Self { user_count }
    }
}

impl Runner for FixedUserRunner {
    fn continue_(&self, sent: u64, _start_time: Instant) -> bool {
        sent < self.user_count
    }

    fn progress(&self, sent: u64, _start_time: Instant) -> f64 {
        if self.user_count == 0 {
            return 1.0;
        }
        (sent as f64 / self.user_count as f64).clamp(0.0, 1.0)
    }

    fn info(&self) -> String {
        format!("FixedUserRunner({})", self.user_count)
    }
}

/// Selects a runner per the `choose-runner` rule: duration wins over
/// request count, which wins over a fixed single pass per user.
pub fn choose_runner(
    duration: Option<Duration>,
    requests: Option<u64>,
    user_count: u64,
) -> Box<dyn Runner> {
    if let Some(duration) = duration {
        Box::new(DurationRunner::new(duration))
    } else if let Some(requests) = requests {
        Box::new(RequestCountRunner::new(requests))
    } else {
        Box::new(FixedUserRunner::new(user_count))
    }
}
