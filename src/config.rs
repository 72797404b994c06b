//! Simulation options and the synchronous configuration validator.
//!
//! Schema validation of user-supplied configuration is explicitly out of
//! scope (spec.md §1) — assumed done upstream, by something like the
//! teacher's YAML loader. What remains in scope, and is implemented here, is
//! the "external validator" spec.md §4.6 step 1 delegates to: a fail-fast
//! synchronous pass over the already-constructed `SimulationOptions` and
//! `Scenario` values, grounded in the teacher's `config_validation.rs`
//! field-level error style.

use crate::context::Context;
use crate::errors::SimulationError;
use crate::scenario::{ConcurrencyDistributionFn, Scenario};
use std::path::PathBuf;
use std::time::Duration;

/// Options shared by every scenario in a `run`/`run_scenarios` call.
#[derive(Clone)]
pub struct SimulationOptions {
    /// Count of virtual users, used to derive `users` when it's unset.
    pub concurrency: u64,
    /// Explicit user-id sequence; overrides `[0..concurrency)` when set.
    pub users: Option<Vec<u64>>,
    /// Total-request cap; wins over `concurrency` alone when set.
    pub requests: Option<u64>,
    /// Wall-clock cap; wins over `requests` when set.
    pub duration: Option<Duration>,
    /// Per-step deadline. Default 5000ms.
    pub timeout_in_ms: u64,
    /// Global context merged under every scenario's own context.
    pub context: Context,
    /// Optional ramp-shaping function; absent means all users start at once.
    pub concurrency_distribution: Option<ConcurrencyDistributionFn>,
    /// Opaque handle for captured step exceptions; `None` discards them.
    pub error_file: Option<PathBuf>,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            users: None,
            requests: None,
            duration: None,
            timeout_in_ms: 5000,
            context: Context::new(),
            concurrency_distribution: None,
            error_file: None,
        }
    }
}

impl SimulationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency(mut self, concurrency: u64) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_users(mut self, users: Vec<u64>) -> Self {
        self.users = Some(users);
        self
    }

    pub fn with_requests(mut self, requests: u64) -> Self {
        self.requests = Some(requests);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_in_ms: u64) -> Self {
        self.timeout_in_ms = timeout_in_ms;
        self
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn with_concurrency_distribution(mut self, f: ConcurrencyDistributionFn) -> Self {
        self.concurrency_distribution = Some(f);
        self
    }

    pub fn with_error_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.error_file = Some(path.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_in_ms)
    }

    /// `options.users ?? [0..concurrency)`, per spec.md §4.6 step 2.
    pub fn resolve_user_ids(&self) -> Vec<u64> {
        self.users.clone().unwrap_or_else(|| (0..self.concurrency).collect())
    }
}

/// Fail-fast validation of a simulation's shape, run before any task starts
/// (spec.md §4.6 step 1, §7 kind 4).
pub fn validate(options: &SimulationOptions, scenarios: &[Scenario]) -> Result<(), SimulationError> {
    if scenarios.is_empty() {
        return Err(SimulationError::InvalidConfiguration(
            "simulation must declare at least one scenario".into(),
        ));
    }

    if options.timeout_in_ms == 0 {
        return Err(SimulationError::InvalidConfiguration(
            "timeout_in_ms must be > 0".into(),
        ));
    }

    if let Some(duration) = options.duration {
        if duration.is_zero() {
            return Err(SimulationError::InvalidConfiguration(
                "duration must be > 0 when set".into(),
            ));
        }
    }

    for scenario in scenarios {
        if scenario.name.trim().is_empty() {
            return Err(SimulationError::InvalidConfiguration(
                "scenario name must not be empty".into(),
            ));
        }
        if scenario.steps.is_empty() && scenario.step_fn.is_none() {
            return Err(SimulationError::InvalidConfiguration(format!(
                "scenario '{}' has no steps and no step_fn",
                scenario.name
            )));
        }
        if scenario.weight < 0.0 {
            return Err(SimulationError::InvalidConfiguration(format!(
                "scenario '{}' has a negative weight",
                scenario.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Step;

    fn ok_scenario() -> Scenario {
        Scenario::new("checkout", vec![Step::from_sync("s", |ctx| (true, ctx))])
    }

    #[test]
    fn resolve_user_ids_defaults_to_concurrency_range() {
        let options = SimulationOptions::new().with_concurrency(3);
        assert_eq!(options.resolve_user_ids(), vec![0, 1, 2]);
    }

    #[test]
    fn resolve_user_ids_prefers_explicit_users() {
        let options = SimulationOptions::new()
            .with_concurrency(3)
            .with_users(vec![10, 20]);
        assert_eq!(options.resolve_user_ids(), vec![10, 20]);
    }

    #[test]
    fn rejects_empty_scenario_list() {
        let options = SimulationOptions::new();
        assert!(validate(&options, &[]).is_err());
    }

    #[test]
    fn zero_concurrency_without_explicit_users_is_a_valid_empty_run() {
        // spec.md §8 boundary: `concurrency = 0` → empty output, clean close,
        // not a configuration error.
        let options = SimulationOptions::new().with_concurrency(0);
        assert!(validate(&options, &[ok_scenario()]).is_ok());
        assert!(options.resolve_user_ids().is_empty());
    }

    #[test]
    fn rejects_scenario_with_no_steps_and_no_step_fn() {
        let options = SimulationOptions::new();
        let scenario = Scenario::new("empty", vec![]);
        assert!(validate(&options, &[scenario]).is_err());
    }

    #[test]
    fn accepts_well_formed_configuration() {
        let options = SimulationOptions::new();
        assert!(validate(&options, &[ok_scenario()]).is_ok());
    }
}
