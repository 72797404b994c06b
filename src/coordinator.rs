//! Simulation Coordinator: the two public entry points, `run` and
//! `run_scenarios` (spec.md §4.6, §6).

use crate::config::{validate, SimulationOptions};
use crate::distribution::distribute_users;
use crate::error_sink::{ErrorSink, FileErrorSink, NullErrorSink};
use crate::errors::SimulationError;
use crate::records::ScenarioRecord;
use crate::runner::choose_runner;
use crate::scenario::{Scenario, Simulation};
use crate::shaper;
use crate::state::SharedState;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{StreamExt, StreamMap};
use tracing::info;

const OUTPUT_CAPACITY: usize = 256;

/// Top-level entry point: runs every scenario in `simulation`, applying the
/// simulation's pre/post hooks and deriving user ids and weighted scenario
/// assignment from `options`.
pub async fn run(
    simulation: Simulation,
    mut options: SimulationOptions,
) -> Result<mpsc::Receiver<ScenarioRecord>, SimulationError> {
    validate(&options, &simulation.scenarios)?;

    if let Some(pre_hook) = &simulation.pre_hook {
        options.context = pre_hook.call(options.context.clone()).await;
    }

    let user_ids = options.resolve_user_ids();
    let assignments = distribute_users(&simulation.scenarios, &user_ids);

    let mut scenarios = simulation.scenarios;
    for (scenario, users) in scenarios.iter_mut().zip(assignments) {
        scenario.users = users;
    }

    let post_hook = simulation.post_hook.clone();
    run_pipelines(options, scenarios, post_hook).await
}

/// Lower-level entry point: skips the simulation-level pre-hook and user-id
/// derivation. `scenarios` must already carry their concrete `users` lists.
pub async fn run_scenarios(
    options: SimulationOptions,
    scenarios: Vec<Scenario>,
) -> Result<mpsc::Receiver<ScenarioRecord>, SimulationError> {
    validate(&options, &scenarios)?;
    run_pipelines(options, scenarios, None).await
}

async fn run_pipelines(
    options: SimulationOptions,
    scenarios: Vec<Scenario>,
    post_hook: Option<Arc<dyn crate::scenario::ContextHook>>,
) -> Result<mpsc::Receiver<ScenarioRecord>, SimulationError> {
    let state = SharedState::new();
    let start_time = Instant::now();
    let timeout = options.timeout();

    let error_sink: Arc<dyn ErrorSink> = match &options.error_file {
        Some(path) => Arc::new(FileErrorSink::new(path)),
        None => Arc::new(NullErrorSink),
    };

    let total_users: u64 = scenarios.iter().map(|s| s.users.len() as u64).sum();
    let runner: Arc<dyn crate::runner::Runner> =
        Arc::from(choose_runner(options.duration, options.requests, total_users));

    info!(
        scenarios = scenarios.len(),
        users = total_users,
        runner = %runner.info(),
        "starting simulation"
    );

    let (out_tx, out_rx) = mpsc::channel(OUTPUT_CAPACITY);

    tokio::spawn(async move {
        let mut merged: StreamMap<String, ReceiverStream<ScenarioRecord>> = StreamMap::new();
        for scenario in scenarios {
            if scenario.users.is_empty() {
                continue;
            }
            let name = scenario.name.clone();
            let rx = shaper::run_scenario_pipeline(
                Arc::new(scenario),
                options.context.clone(),
                options.concurrency_distribution.clone(),
                timeout,
                runner.clone(),
                start_time,
                state.clone(),
                error_sink.clone(),
            );
            merged.insert(name, ReceiverStream::new(rx));
        }

        while let Some((_scenario_name, record)) = merged.next().await {
            if out_tx.send(record).await.is_err() {
                break;
            }
        }

        if let Some(post_hook) = post_hook {
            post_hook.call(options.context.clone()).await;
        }

        info!("simulation complete");
    });

    Ok(out_rx)
}
