//! Runs one user-supplied step against one context with a deadline.
//!
//! Implements spec §4.2's six-step contract: evaluate `sleep_before`,
//! increment `sent_requests` before the timeout race begins, race the
//! normalized step future against the deadline, and never let an exception
//! escape — it's captured onto the record and forwarded to the error sink
//! instead.

use crate::context::Context;
use crate::error_sink::{ErrorSink, ExceptionEntry};
use crate::metrics::{PercentileTracker, REQUEST_DURATION_SECONDS, SENT_REQUESTS_TOTAL};
use crate::records::RequestRecord;
use crate::scenario::Step;
use crate::state::SharedState;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

lazy_static::lazy_static! {
    static ref REQUEST_PERCENTILES: PercentileTracker = PercentileTracker::new();
}

fn now_ms(state: &SharedState) -> u64 {
    state.start_time.elapsed().as_millis() as u64
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "step panicked with a non-string payload".to_string()
    }
}

/// Execute `step` once against `context`, honoring `timeout`.
///
/// Returns the completed [`RequestRecord`] and the context subsequent steps
/// should see — `context_after` on success or timeout-miss, the
/// step's own replacement on success.
pub async fn execute(
    scenario_name: &str,
    step: &Step,
    context: Context,
    user_id: u64,
    timeout: Duration,
    state: &SharedState,
    error_sink: &dyn ErrorSink,
) -> (RequestRecord, Context) {
    if let Some(sleep_before) = &step.sleep_before {
        let delay_ms = sleep_before(&context);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }

    state.record_request_sent();
    SENT_REQUESTS_TOTAL.inc();

    let context_before = context.with_user_id(user_id);
    let start = now_ms(state);

    let guarded = AssertUnwindSafe(step.request.call(context_before.clone())).catch_unwind();

    let (result, context_after, exception) = match tokio::time::timeout(timeout, guarded).await {
        Ok(Ok((result, context_after))) => (result, context_after, None),
        Ok(Err(panic_payload)) => {
            let text = panic_message(panic_payload);
            error_sink
                .write(ExceptionEntry {
                    scenario: scenario_name,
                    step: &step.name,
                    user_id,
                    text: &text,
                })
                .await;
            (false, context_before.clone(), Some(text))
        }
        Err(_elapsed) => (false, context_before.clone(), None),
    };

    let end = now_ms(state);
    let duration_ms = end.saturating_sub(start);

    REQUEST_DURATION_SECONDS
        .with_label_values(&[scenario_name, &step.name, if result { "pass" } else { "fail" }])
        .observe(duration_ms as f64 / 1000.0);
    REQUEST_PERCENTILES.record_ms(duration_ms);

    let record = RequestRecord {
        name: step.name.clone(),
        id: user_id,
        start,
        end,
        result,
        context_before,
        context_after: context_after.clone(),
        exception,
    };

    (record, context_after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_sink::NullErrorSink;
    use crate::scenario::Step;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn successful_step_records_pass_and_new_context() {
        let state = SharedState::new();
        let step = Step::from_sync("touch", |mut ctx| {
            ctx.set("seen", true);
            (true, ctx)
        });

        let (record, ctx) = execute(
            "s",
            &step,
            Context::new(),
            1,
            Duration::from_millis(50),
            &state,
            &NullErrorSink,
        )
        .await;

        assert!(record.result);
        assert!(record.start <= record.end);
        assert_eq!(ctx.get("seen"), Some(&serde_json::json!(true)));
        assert_eq!(state.sent_requests(), 1);
    }

    #[tokio::test]
    async fn timeout_records_failure_without_mutating_context() {
        let state = SharedState::new();
        let step = Step::from_fn("slow", |ctx| async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            (true, ctx)
        });

        let (record, ctx) = execute(
            "s",
            &step,
            Context::new(),
            1,
            Duration::from_millis(20),
            &state,
            &NullErrorSink,
        )
        .await;

        assert!(!record.result);
        assert!(record.exception.is_none());
        assert!(record.duration_ms() < 200);
        assert_eq!(ctx, record.context_before);
    }

    #[tokio::test]
    async fn panicking_step_is_captured_as_exception() {
        let state = SharedState::new();
        let step = Step::from_fn("boom", |_ctx| async move {
            panic!("kaboom");
            #[allow(unreachable_code)]
            (true, Context::new())
        });

        let (record, _ctx) = execute(
            "s",
            &step,
            Context::new(),
            1,
            Duration::from_millis(50),
            &state,
            &NullErrorSink,
        )
        .await;

        assert!(!record.result);
        assert_eq!(record.exception.as_deref(), Some("kaboom"));
    }

    #[tokio::test]
    async fn sleep_before_is_awaited_before_dispatch() {
        let state = SharedState::new();
        let step = Step::from_sync("noop", |ctx| (true, ctx))
            .with_sleep_before(Arc::new(|_ctx: &Context| 30));

        let started = std::time::Instant::now();
        let (_record, _ctx) = execute(
            "s",
            &step,
            Context::new(),
            1,
            Duration::from_millis(500),
            &state,
            &NullErrorSink,
        )
        .await;

        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
