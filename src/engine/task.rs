//! Task: an ordered list of steps sharing the module's result

use async_trait::async_trait;
use tracing::{debug, debug_span, warn, Instrument, Span};

use crate::engine::context::ExecutionContext;
use crate::engine::error::EngineError;
use crate::engine::result::ModuleResult;
use crate::engine::step::{Step, StepOutcome};

#[async_trait]
pub trait Task: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    async fn is_skip(&self, _ctx: &ExecutionContext) -> Result<bool, EngineError> {
        Ok(false)
    }

    /// Bind the task to its execution context before `init`
    fn bind(&mut self, ctx: &ExecutionContext) -> Result<(), EngineError>;

    async fn auto_assert(&self, _ctx: &ExecutionContext) -> Result<(), EngineError> {
        Ok(())
    }

    async fn init(&mut self, ctx: &ExecutionContext) -> Result<(), EngineError>;

    async fn run(&mut self, ctx: &ExecutionContext, result: &mut ModuleResult);

    async fn until(&mut self, _ctx: &ExecutionContext) -> Result<bool, EngineError> {
        Ok(true)
    }
}

type SkipPredicate = Box<dyn Fn(&ExecutionContext) -> bool + Send + Sync>;

/// General purpose task: runs its steps in order
pub struct StepTask {
    name: String,
    description: String,
    steps: Vec<Box<dyn Step>>,
    skip_if: Option<SkipPredicate>,
    span: Span,
}

impl StepTask {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            steps: Vec::new(),
            skip_if: None,
            span: Span::none(),
        }
    }

    pub fn with_step(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn with_boxed_step(mut self, step: Box<dyn Step>) -> Self {
        self.steps.push(step);
        self
    }

    /// Skip the task whenever `predicate` holds
    pub fn skip_if(
        mut self,
        predicate: impl Fn(&ExecutionContext) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.skip_if = Some(Box::new(predicate));
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

#[async_trait]
impl Task for StepTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn is_skip(&self, ctx: &ExecutionContext) -> Result<bool, EngineError> {
        Ok(self.skip_if.as_ref().is_some_and(|predicate| predicate(ctx)))
    }

    fn bind(&mut self, _ctx: &ExecutionContext) -> Result<(), EngineError> {
        self.span = debug_span!("task", name = %self.name);
        Ok(())
    }

    async fn init(&mut self, ctx: &ExecutionContext) -> Result<(), EngineError> {
        for step in self.steps.iter_mut() {
            step.init(ctx).await.map_err(|e| EngineError::InitFailed {
                unit: format!("{}/{}", self.name, step.name()),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    async fn run(&mut self, ctx: &ExecutionContext, result: &mut ModuleResult) {
        let span = self.span.clone();
        run_steps(&self.name, &mut self.steps, ctx, result)
            .instrument(span)
            .await;
    }
}

/// Run `steps` in order, recording one error per failed step.
///
/// A step fails when `execute` errors, reports `success == false`, or its
/// `post` errors. Without ignore-error the remaining steps are not run.
pub async fn run_steps(
    task: &str,
    steps: &mut [Box<dyn Step>],
    ctx: &ExecutionContext,
    result: &mut ModuleResult,
) {
    let ignore_err = ctx.ignore_err();

    for step in steps.iter_mut() {
        let step_name = step.name().to_string();
        debug!("Executing step {}", step_name);

        let executed = step.execute(ctx).await;
        let posted = step.post(ctx, executed.as_ref().err()).await;

        let Some(reason) = failure_reason(&executed, &posted) else {
            debug!("Step {} succeeded", step_name);
            continue;
        };

        warn!("Step {} failed: {}", step_name, reason);
        result.add_error(EngineError::StepFailed {
            task: task.to_string(),
            step: step_name,
            reason,
        });

        if !ignore_err {
            break;
        }
    }
}

fn failure_reason(
    executed: &Result<StepOutcome, EngineError>,
    posted: &Result<(), EngineError>,
) -> Option<String> {
    match (executed, posted) {
        (Err(exec), Err(post)) => Some(format!("{exec} (post: {post})")),
        (Err(exec), Ok(())) => Some(exec.to_string()),
        (Ok(_), Err(post)) => Some(format!("post: {post}")),
        (Ok(outcome), Ok(())) if !outcome.success => {
            Some(format!("reported failure: {}", outcome.output.trim()))
        }
        _ => None,
    }
}
