//! Error taxonomy for the simulation engine.
//!
//! Step failures, timeouts, and exceptions are *data* — they live on
//! [`crate::records::RequestRecord`], never here. [`SimulationError`] is
//! reserved for the one condition spec §7 says can abort `run` before a
//! result stream exists, plus the catastrophic, engine-internal errors that
//! degrade gracefully rather than propagate.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SimulationError {
    /// Kind 4 (spec §7): malformed `Simulation`/`SimulationOptions`, caught
    /// synchronously before any task starts.
    #[error("invalid simulation configuration: {0}")]
    InvalidConfiguration(String),

    /// Kind 5 (spec §7): an engine-internal failure such as the error sink's
    /// parent directory being uncreatable. Surfaced to the caller only when
    /// it happens before `run` can hand back a stream; once streaming has
    /// started this kind is logged and the engine continues.
    #[error("internal simulation error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_configuration_message_round_trips() {
        let err = SimulationError::InvalidConfiguration("concurrency must be > 0".into());
        assert_eq!(
            err.to_string(),
            "invalid simulation configuration: concurrency must be > 0"
        );
    }
}
