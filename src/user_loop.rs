//! User Loop: for one virtual user, repeatedly walks its scenario while
//! admission and the runner permit (spec.md §4.4).

use crate::context::Context;
use crate::error_sink::ErrorSink;
use crate::metrics::{CONCURRENT_SCENARIOS, SCENARIO_DURATION_SECONDS};
use crate::records::ScenarioRecord;
use crate::runner::Runner;
use crate::scenario::Scenario;
use crate::shaper::ConcurrencyGate;
use crate::state::SharedState;
use crate::walker;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const ADMISSION_PARK: Duration = Duration::from_millis(200);
const OUTPUT_CAPACITY: usize = 16;

/// Spawn the user-loop task for `user_id` and return the channel its
/// [`ScenarioRecord`]s arrive on. The channel closes (sender dropped) once
/// `runner.continue_` goes false.
#[allow(clippy::too_many_arguments)]
pub fn spawn(
    scenario: Arc<Scenario>,
    options_context: Context,
    user_id: u64,
    timeout: Duration,
    runner: Arc<dyn Runner>,
    start_time: Instant,
    state: Arc<SharedState>,
    error_sink: Arc<dyn ErrorSink>,
    gate: Option<ConcurrencyGate>,
) -> mpsc::Receiver<ScenarioRecord> {
    let (tx, rx) = mpsc::channel(OUTPUT_CAPACITY);

    tokio::spawn(async move {
        while runner.continue_(state.sent_requests(), start_time) {
            if let Some(gate) = &gate {
                while gate.deficit(&options_context) <= 0 {
                    tokio::time::sleep(ADMISSION_PARK).await;
                    if !runner.continue_(state.sent_requests(), start_time) {
                        return;
                    }
                }
            }

            state.scenario_started();
            CONCURRENT_SCENARIOS.inc();
            let record = walker::walk_once(
                &scenario,
                options_context.clone(),
                user_id,
                timeout,
                runner.as_ref(),
                start_time,
                &state,
                error_sink.as_ref(),
            )
            .await;
            state.scenario_finished();
            CONCURRENT_SCENARIOS.dec();

            SCENARIO_DURATION_SECONDS
                .with_label_values(&[&scenario.name, if record.success() { "pass" } else { "fail" }])
                .observe(record.duration_ms() as f64 / 1000.0);

            if tx.send(record).await.is_err() {
                return;
            }
        }
    });

    rx
}
