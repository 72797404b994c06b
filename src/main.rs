//! Thin CLI front-end over the `vuser_sim` library: runs a small built-in
//! scenario and prints a summary. Parsing a user-authored scenario file is
//! outside the engine's scope (spec.md §1); this binary exists to exercise
//! the library end-to-end, the way the teacher's own `main.rs` drove its
//! HTTP load test.

use mimalloc::MiMalloc;
use std::time::Duration;
use vuser_sim::{run_scenarios, Scenario, SimulationOptions, Step};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    vuser_sim::logging::init();
    vuser_sim::metrics::register_metrics().ok();

    let scenario = Scenario::new(
        "hello",
        vec![
            Step::from_fn("ping", |ctx| async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                (true, ctx)
            }),
            Step::from_fn("pong", |ctx| async move { (true, ctx) }),
        ],
    )
    .with_users(vec![1, 2, 3, 4, 5]);

    let options = SimulationOptions::new()
        .with_timeout_ms(1000)
        .with_requests(25);

    let mut records = run_scenarios(options, vec![scenario]).await?;

    let mut scenarios_completed = 0u64;
    let mut steps_completed = 0u64;
    while let Some(record) = records.recv().await {
        scenarios_completed += 1;
        steps_completed += record.requests.len() as u64;
        tracing::info!(
            user_id = record.id,
            success = record.success(),
            duration_ms = record.duration_ms(),
            "scenario walk complete"
        );
    }

    println!(
        "{scenarios_completed} scenario walks, {steps_completed} steps, metrics:\n{}",
        vuser_sim::metrics::gather_metrics_string()
    );

    Ok(())
}
