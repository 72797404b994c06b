//! Example of running two weighted scenarios with a linear ramp-up.
//!
//! Demonstrates `run` with a `Simulation` of multiple scenarios, a
//! `concurrency_distribution` ramp, and a simulation-level post-hook.
//!
//! Run with: cargo run --example weighted_scenarios

use std::sync::Arc;
use std::time::Duration;
use vuser_sim::{run, FnHook, Scenario, SimulationOptions, Simulation, Step};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    vuser_sim::logging::init();

    let browse = Scenario::new(
        "browse",
        vec![
            Step::from_fn("list_products", |ctx| async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                (true, ctx)
            }),
            Step::from_fn("view_product", |ctx| async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                (true, ctx)
            }),
        ],
    )
    .with_weight(80.0);

    let checkout = Scenario::new(
        "checkout",
        vec![Step::from_fn("place_order", |ctx| async move {
            tokio::time::sleep(Duration::from_millis(15)).await;
            (true, ctx)
        })],
    )
    .with_weight(20.0);

    let simulation = Simulation::new(vec![browse, checkout]).with_post_hook(Arc::new(FnHook(
        |_ctx| async move {
            println!("simulation finished");
            _ctx
        },
    )));

    let options = SimulationOptions::new()
        .with_concurrency(20)
        .with_duration(Duration::from_millis(500))
        .with_concurrency_distribution(Arc::new(|progress, _ctx| progress));

    let mut records = run(simulation, options).await?;

    let mut total = 0u64;
    while let Some(record) = records.recv().await {
        total += 1;
        if !record.success() {
            println!("scenario {} user {} failed", record.name, record.id);
        }
    }
    println!("{total} scenario walks completed");

    Ok(())
}
