//! Scenario and step definitions.
//!
//! A [`Scenario`] is an ordered workflow of [`Step`]s representing what one
//! virtual user does. Steps, the dynamic `step_fn` generator, and the pre/post
//! hooks are all user-supplied callables; this module defines the traits the
//! engine calls through and a handful of `Fn`-closure adapters so callers
//! rarely need to hand-write a trait impl.

use crate::context::Context;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// What a step's `request` callable hands back once normalized: whether it
/// passed, and the context subsequent steps should see.
pub type StepOutcome = (bool, Context);

/// A step's HTTP call, RPC, or arbitrary unit of work.
///
/// Implementations must not panic for *expected* failures — return
/// `(false, ctx)` instead. An actual panic is still caught by the executor
/// and recorded as a step exception, but it forwards to the error sink and
/// should be reserved for genuinely unexpected conditions.
#[async_trait]
pub trait StepRequest: Send + Sync {
    async fn call(&self, ctx: Context) -> StepOutcome;
}

/// Adapts a plain `Fn(Context) -> impl Future<Output = StepOutcome>` closure
/// into a [`StepRequest`], so scenarios can be built from closures without a
/// bespoke trait impl per step.
pub struct FnStep<F>(pub F);

#[async_trait]
impl<F, Fut> StepRequest for FnStep<F>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = StepOutcome> + Send,
{
    async fn call(&self, ctx: Context) -> StepOutcome {
        (self.0)(ctx).await
    }
}

/// The dynamic alternative (or supplement) to a scenario's static `steps`
/// list: consulted once the static steps are exhausted, or exclusively when
/// `steps` is empty.
#[async_trait]
pub trait StepFn: Send + Sync {
    /// Returns the next step to run, optionally paired with a replacement
    /// context. Returning `None` ends the walk.
    async fn call(&self, ctx: Context) -> Option<(Step, Context)>;
}

pub struct FnStepFn<F>(pub F);

#[async_trait]
impl<F, Fut> StepFn for FnStepFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = Option<(Step, Context)>> + Send,
{
    async fn call(&self, ctx: Context) -> Option<(Step, Context)> {
        (self.0)(ctx).await
    }
}

/// A scenario-level or simulation-level pre/post hook: `context -> context`.
#[async_trait]
pub trait ContextHook: Send + Sync {
    async fn call(&self, ctx: Context) -> Context;
}

pub struct FnHook<F>(pub F);

#[async_trait]
impl<F, Fut> ContextHook for FnHook<F>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = Context> + Send,
{
    async fn call(&self, ctx: Context) -> Context {
        (self.0)(ctx).await
    }
}

/// `concurrency_distribution(progress, context) -> factor`.
///
/// Evaluated on every ~20ms ramp tick (see [`crate::shaper`]), so
/// implementations must be synchronous and cheap — no I/O, no awaiting.
pub type ConcurrencyDistributionFn = Arc<dyn Fn(f64, &Context) -> f64 + Send + Sync>;

/// `sleep_before(context) -> milliseconds`, evaluated once per step
/// invocation before the request is dispatched.
pub type SleepBeforeFn = Arc<dyn Fn(&Context) -> u64 + Send + Sync>;

/// One unit of work within a scenario.
#[derive(Clone)]
pub struct Step {
    pub name: String,
    pub request: Arc<dyn StepRequest>,
    pub sleep_before: Option<SleepBeforeFn>,
}

impl Step {
    pub fn new(name: impl Into<String>, request: Arc<dyn StepRequest>) -> Self {
        Self {
            name: name.into(),
            request,
            sleep_before: None,
        }
    }

    /// Build a step from a closure returning a future, the common case.
    pub fn from_fn<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StepOutcome> + Send + 'static,
    {
        Self::new(name, Arc::new(FnStep(f)))
    }

    /// Build a step from a plain synchronous closure — useful for tests and
    /// scenarios that don't need to await anything.
    pub fn from_sync<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Context) -> StepOutcome + Send + Sync + 'static,
    {
        Self::new(
            name,
            Arc::new(FnStep(move |ctx: Context| {
                let out = f(ctx);
                Box::pin(async move { out }) as BoxFuture<'static, StepOutcome>
            })),
        )
    }

    pub fn with_sleep_before(mut self, f: SleepBeforeFn) -> Self {
        self.sleep_before = Some(f);
        self
    }

    pub fn with_fixed_sleep(self, delay: Duration) -> Self {
        let ms = delay.as_millis() as u64;
        self.with_sleep_before(Arc::new(move |_ctx: &Context| ms))
    }
}

/// An ordered workflow of [`Step`]s representing what one virtual user does.
#[derive(Clone)]
pub struct Scenario {
    pub name: String,
    pub steps: Vec<Step>,
    pub step_fn: Option<Arc<dyn StepFn>>,
    pub context: Context,
    pub users: Vec<u64>,
    pub weight: f64,
    pub pre_hook: Option<Arc<dyn ContextHook>>,
    pub post_hook: Option<Arc<dyn ContextHook>>,
    pub skip_next_after_failure: bool,
    pub allow_early_termination: bool,
}

impl Scenario {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
            step_fn: None,
            context: Context::new(),
            users: Vec::new(),
            weight: 1.0,
            pre_hook: None,
            post_hook: None,
            skip_next_after_failure: true,
            allow_early_termination: false,
        }
    }

    pub fn with_step_fn(mut self, step_fn: Arc<dyn StepFn>) -> Self {
        self.step_fn = Some(step_fn);
        self
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_users(mut self, users: Vec<u64>) -> Self {
        self.users = users;
        self
    }

    pub fn with_pre_hook(mut self, hook: Arc<dyn ContextHook>) -> Self {
        self.pre_hook = Some(hook);
        self
    }

    pub fn with_post_hook(mut self, hook: Arc<dyn ContextHook>) -> Self {
        self.post_hook = Some(hook);
        self
    }

    pub fn skip_next_after_failure(mut self, value: bool) -> Self {
        self.skip_next_after_failure = value;
        self
    }

    pub fn allow_early_termination(mut self, value: bool) -> Self {
        self.allow_early_termination = value;
        self
    }
}

/// The top-level unit `run` accepts: a set of weighted scenarios plus
/// simulation-wide hooks invoked once per `run` call, not once per user.
#[derive(Clone)]
pub struct Simulation {
    pub scenarios: Vec<Scenario>,
    pub pre_hook: Option<Arc<dyn ContextHook>>,
    pub post_hook: Option<Arc<dyn ContextHook>>,
}

impl Simulation {
    pub fn new(scenarios: Vec<Scenario>) -> Self {
        Self {
            scenarios,
            pre_hook: None,
            post_hook: None,
        }
    }

    pub fn with_pre_hook(mut self, hook: Arc<dyn ContextHook>) -> Self {
        self.pre_hook = Some(hook);
        self
    }

    pub fn with_post_hook(mut self, hook: Arc<dyn ContextHook>) -> Self {
        self.post_hook = Some(hook);
        self
    }
}
