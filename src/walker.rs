//! Scenario Walker: walks one scenario's steps for one virtual user once.
//!
//! Implements spec §4.3's cursor algorithm — static `steps` first, then the
//! dynamic `step_fn` once the static list is exhausted — threading context
//! through pre-hook, each step, and post-hook.

use crate::context::Context;
use crate::error_sink::ErrorSink;
use crate::executor;
use crate::records::{RequestRecord, ScenarioRecord};
use crate::runner::Runner;
use crate::scenario::Scenario;
use crate::state::SharedState;
use std::time::{Duration, Instant};

/// Cursor over a scenario's steps: the static list first, the dynamic
/// generator once the list is exhausted.
enum Cursor<'a> {
    Static(std::slice::Iter<'a, crate::scenario::Step>),
    Dynamic,
}

/// Walk `scenario` once for `user_id`, honoring `timeout` for each step and
/// consulting `runner` for the early-termination tie-break.
pub async fn walk_once(
    scenario: &Scenario,
    initial_context: Context,
    user_id: u64,
    timeout: Duration,
    runner: &dyn Runner,
    start_time: Instant,
    state: &SharedState,
    error_sink: &dyn ErrorSink,
) -> ScenarioRecord {
    // `options.context ⊕ scenario.context`, scenario overrides.
    let merged_context = initial_context.merge(&scenario.context);

    let mut ctx = if let Some(pre_hook) = &scenario.pre_hook {
        pre_hook.call(merged_context).await
    } else {
        merged_context
    };

    let mut requests: Vec<RequestRecord> = Vec::new();
    let mut cursor = Cursor::Static(scenario.steps.iter());

    loop {
        let next_step = match &mut cursor {
            Cursor::Static(iter) => match iter.next() {
                Some(step) => Some((step.clone(), ctx.clone())),
                None => {
                    cursor = Cursor::Dynamic;
                    None
                }
            },
            Cursor::Dynamic => None,
        };

        let (step, ctx_in) = match next_step {
            Some(pair) => pair,
            None => match &cursor {
                Cursor::Dynamic => {
                    let Some(step_fn) = &scenario.step_fn else {
                        break;
                    };
                    match step_fn.call(ctx.clone()).await {
                        Some((step, new_ctx)) => (step, new_ctx),
                        None => break,
                    }
                }
                Cursor::Static(_) => break,
            },
        };

        let (record, ctx_out) = executor::execute(
            &scenario.name,
            &step,
            ctx_in,
            user_id,
            timeout,
            state,
            error_sink,
        )
        .await;

        let failed = !record.result;
        requests.push(record);

        let stop_early =
            !runner.continue_(state.sent_requests(), start_time) && scenario.allow_early_termination;
        let skip_rest = scenario.skip_next_after_failure && failed;

        ctx = ctx_out;

        if stop_early || skip_rest {
            break;
        }
    }

    if let Some(post_hook) = &scenario.post_hook {
        post_hook.call(ctx).await;
    }

    ScenarioRecord::from_requests(scenario.name.clone(), user_id, requests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_sink::NullErrorSink;
    use crate::runner::RequestCountRunner;
    use crate::scenario::Step;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    fn always_continue() -> RequestCountRunner {
        RequestCountRunner::new(u64::MAX)
    }

    #[tokio::test]
    async fn two_step_success_produces_two_records() {
        let scenario = Scenario::new(
            "checkout",
            vec![
                Step::from_sync("one", |ctx| (true, ctx)),
                Step::from_sync("two", |ctx| (true, ctx)),
            ],
        );
        let state = SharedState::new();
        let runner = always_continue();

        let record = walk_once(
            &scenario,
            Context::new(),
            1,
            Duration::from_millis(50),
            &runner,
            Instant::now(),
            &state,
            &NullErrorSink,
        )
        .await;

        assert_eq!(record.requests.len(), 2);
        assert!(record.success());
    }

    #[tokio::test]
    async fn skip_on_failure_stops_after_first_step() {
        let scenario = Scenario::new(
            "checkout",
            vec![
                Step::from_sync("fail", |ctx| (false, ctx)),
                Step::from_sync("succeed", |ctx| (true, ctx)),
            ],
        )
        .skip_next_after_failure(true);
        let state = SharedState::new();
        let runner = always_continue();

        let record = walk_once(
            &scenario,
            Context::new(),
            1,
            Duration::from_millis(50),
            &runner,
            Instant::now(),
            &state,
            &NullErrorSink,
        )
        .await;

        assert_eq!(record.requests.len(), 1);
        assert!(!record.requests[0].result);
    }

    #[tokio::test]
    async fn no_skip_runs_both_steps() {
        let scenario = Scenario::new(
            "checkout",
            vec![
                Step::from_sync("fail", |ctx| (false, ctx)),
                Step::from_sync("succeed", |ctx| (true, ctx)),
            ],
        )
        .skip_next_after_failure(false);
        let state = SharedState::new();
        let runner = always_continue();

        let record = walk_once(
            &scenario,
            Context::new(),
            1,
            Duration::from_millis(50),
            &runner,
            Instant::now(),
            &state,
            &NullErrorSink,
        )
        .await;

        assert_eq!(record.requests.len(), 2);
        assert!(!record.requests[0].result);
        assert!(record.requests[1].result);
    }

    #[tokio::test]
    async fn context_threads_through_step_fn_loop() {
        let counter = Arc::new(AtomicU64::new(0));
        let counter_fn = counter.clone();
        let scenario = Scenario::new("loop", vec![]).with_step_fn(Arc::new(
            crate::scenario::FnStepFn(move |ctx: Context| {
                let counter_fn = counter_fn.clone();
                async move {
                    let n = counter_fn.fetch_add(1, Ordering::SeqCst);
                    if n >= 3 {
                        return None;
                    }
                    let mut next_ctx = ctx.clone();
                    next_ctx.set("counter", n);
                    let step = Step::from_sync("tick", move |ctx| (true, ctx));
                    Some((step, next_ctx))
                }
            }),
        ));
        let state = SharedState::new();
        let runner = always_continue();

        let record = walk_once(
            &scenario,
            Context::new(),
            1,
            Duration::from_millis(50),
            &runner,
            Instant::now(),
            &state,
            &NullErrorSink,
        )
        .await;

        assert_eq!(record.requests.len(), 3);
        let counters: Vec<u64> = record
            .requests
            .iter()
            .map(|r| {
                r.context_before
                    .get("counter")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(99)
            })
            .collect();
        assert_eq!(counters, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn post_hook_sees_most_recent_context_on_failure() {
        let scenario = Scenario::new(
            "checkout",
            vec![Step::from_sync("fail", |mut ctx| {
                ctx.set("touched", true);
                (false, ctx)
            })],
        )
        .skip_next_after_failure(true)
        .with_post_hook(Arc::new(crate::scenario::FnHook(|ctx: Context| async move {
            ctx
        })));
        let state = SharedState::new();
        let runner = always_continue();

        let record = walk_once(
            &scenario,
            Context::new(),
            1,
            Duration::from_millis(50),
            &runner,
            Instant::now(),
            &state,
            &NullErrorSink,
        )
        .await;

        assert_eq!(
            record.requests[0].context_after.get("touched"),
            Some(&serde_json::json!(true))
        );
    }
}
