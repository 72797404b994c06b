//! Concurrency Shaper: tracks the deficit between target and observed
//! concurrency, and drives ramp-up by spawning user loops in batches.
//!
//! Grounded in the teacher's dependency on `tokio-stream` (originally pulled
//! in for gRPC response streaming, now trimmed along with `tonic`): the same
//! crate's `StreamMap` does the N-producer fan-in this module needs to merge
//! every ramped-in user's output into one scenario stream.

use crate::context::Context;
use crate::error_sink::ErrorSink;
use crate::records::ScenarioRecord;
use crate::runner::Runner;
use crate::scenario::{ConcurrencyDistributionFn, Scenario};
use crate::state::SharedState;
use crate::user_loop;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{StreamExt, StreamMap};

const MAX_BATCH: usize = 1024;
const RAMP_TICK: Duration = Duration::from_millis(20);
const CHANNEL_CAPACITY: usize = 256;

/// `target = concurrency × distribution(progress, ctx)`, clamped ≥ 0;
/// `deficit = target − observed`.
pub fn deficit(
    concurrency: u64,
    distribution: &ConcurrencyDistributionFn,
    progress: f64,
    ctx: &Context,
    observed: i64,
) -> i64 {
    let target = (concurrency as f64 * distribution(progress, ctx)).max(0.0);
    target as i64 - observed
}

/// Everything a running [`crate::user_loop`] needs to re-check its own
/// admission on each iteration once a concurrency-distribution is
/// configured (spec.md §4.4 step 1).
#[derive(Clone)]
pub struct ConcurrencyGate {
    pub scenario_concurrency: u64,
    pub distribution: ConcurrencyDistributionFn,
    pub runner: Arc<dyn Runner>,
    pub start_time: Instant,
    pub state: Arc<SharedState>,
}

impl ConcurrencyGate {
    pub fn deficit(&self, ctx: &Context) -> i64 {
        let progress = self.runner.progress(self.state.sent_requests(), self.start_time);
        deficit(
            self.scenario_concurrency,
            &self.distribution,
            progress,
            ctx,
            self.state.concurrent_scenarios(),
        )
    }
}

/// Run one scenario's pipeline: spawn its user loops (ramped or immediate)
/// and merge their output into a single stream of [`ScenarioRecord`].
#[allow(clippy::too_many_arguments)]
pub fn run_scenario_pipeline(
    scenario: Arc<Scenario>,
    options_context: Context,
    distribution: Option<ConcurrencyDistributionFn>,
    timeout: Duration,
    runner: Arc<dyn Runner>,
    start_time: Instant,
    state: Arc<SharedState>,
    error_sink: Arc<dyn ErrorSink>,
) -> mpsc::Receiver<ScenarioRecord> {
    let (out_tx, out_rx) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        match distribution {
            Some(distribution) => {
                let gate = ConcurrencyGate {
                    scenario_concurrency: scenario.users.len() as u64,
                    distribution,
                    runner: runner.clone(),
                    start_time,
                    state: state.clone(),
                };
                ramp_scenario(
                    scenario,
                    options_context,
                    timeout,
                    runner,
                    start_time,
                    state,
                    error_sink,
                    gate,
                    out_tx,
                )
                .await;
            }
            None => {
                start_all_immediately(
                    scenario,
                    options_context,
                    timeout,
                    runner,
                    start_time,
                    state,
                    error_sink,
                    out_tx,
                )
                .await;
            }
        }
    });

    out_rx
}

#[allow(clippy::too_many_arguments)]
async fn start_all_immediately(
    scenario: Arc<Scenario>,
    options_context: Context,
    timeout: Duration,
    runner: Arc<dyn Runner>,
    start_time: Instant,
    state: Arc<SharedState>,
    error_sink: Arc<dyn ErrorSink>,
    out_tx: mpsc::Sender<ScenarioRecord>,
) {
    let mut merged = StreamMap::new();
    for user_id in scenario.users.clone() {
        let rx = user_loop::spawn(
            scenario.clone(),
            options_context.clone(),
            user_id,
            timeout,
            runner.clone(),
            start_time,
            state.clone(),
            error_sink.clone(),
            None,
        );
        merged.insert(user_id, ReceiverStream::new(rx));
    }

    while let Some((_user_id, record)) = merged.next().await {
        if out_tx.send(record).await.is_err() {
            break;
        }
    }
}

/// Ramp-up driver (spec.md §4.5): spawns batches of at most `MAX_BATCH` new
/// user loops per `~20ms` tick, sized to the current deficit, until the
/// queue is drained; then lets already-spawned loops finish naturally.
#[allow(clippy::too_many_arguments)]
async fn ramp_scenario(
    scenario: Arc<Scenario>,
    options_context: Context,
    timeout: Duration,
    runner: Arc<dyn Runner>,
    start_time: Instant,
    state: Arc<SharedState>,
    error_sink: Arc<dyn ErrorSink>,
    gate: ConcurrencyGate,
    out_tx: mpsc::Sender<ScenarioRecord>,
) {
    let mut queue: VecDeque<u64> = scenario.users.iter().copied().collect();
    let mut merged: StreamMap<u64, ReceiverStream<ScenarioRecord>> = StreamMap::new();
    let mut ticker = tokio::time::interval(RAMP_TICK);

    loop {
        if !queue.is_empty() {
            let d = gate.deficit(&options_context);
            let n = (d.max(0) as usize).min(MAX_BATCH).min(queue.len());
            for _ in 0..n {
                if let Some(user_id) = queue.pop_front() {
                    let rx = user_loop::spawn(
                        scenario.clone(),
                        options_context.clone(),
                        user_id,
                        timeout,
                        runner.clone(),
                        start_time,
                        state.clone(),
                        error_sink.clone(),
                        Some(gate.clone()),
                    );
                    merged.insert(user_id, ReceiverStream::new(rx));
                }
            }
        }

        // Exit once nothing is in flight and either the queue is drained or
        // the runner has stopped — without the latter check, a distribution
        // that never produces a positive deficit (e.g. `concurrency_distribution
        // ≡ 0`) would spin on the ticker forever instead of closing when the
        // runner does (spec.md §8).
        if merged.is_empty()
            && (queue.is_empty() || !runner.continue_(state.sent_requests(), start_time))
        {
            break;
        }

        tokio::select! {
            _ = ticker.tick() => {}
            maybe = merged.next(), if !merged.is_empty() => {
                if let Some((_user_id, record)) = maybe {
                    if out_tx.send(record).await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    while let Some((_user_id, record)) = merged.next().await {
        if out_tx.send(record).await.is_err() {
            break;
        }
    }
}
