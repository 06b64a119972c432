//! Module: an ordered list of tasks with a post-hook chain

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, info_span, warn, Span};

use crate::engine::context::ExecutionContext;
use crate::engine::error::EngineError;
use crate::engine::hook::{run_post_hooks, PostHook};
use crate::engine::result::ModuleResult;
use crate::engine::spec::SpecSlice;
use crate::engine::task::Task;
use crate::runtime::context::Runtime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleKind {
    /// Runs its tasks inline, in pipeline order
    Sequenced,
    /// Starts work that converges later; `until` reports convergence
    Background,
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleKind::Sequenced => f.write_str("sequenced"),
            ModuleKind::Background => f.write_str("background"),
        }
    }
}

/// Lifecycle driven by the pipeline:
/// `bind` (at construction), then `is_skip`, `auto_assert`, `init`, `run`,
/// `until` and finally `call_post_hook`.
///
/// Most modules only implement `base`, `base_mut`, `bind` and
/// `build_tasks`; the rest defaults to running the tasks in order.
#[async_trait]
pub trait Module: Send + Sync {
    fn base(&self) -> &BaseModule;

    fn base_mut(&mut self) -> &mut BaseModule;

    fn name(&self) -> &str {
        self.base().name()
    }

    fn description(&self) -> &str {
        self.base().description()
    }

    fn kind(&self) -> ModuleKind {
        self.base().kind()
    }

    fn span(&self) -> Span {
        self.base().span().clone()
    }

    /// Bind the module to the runtime and its slice of the cluster definition
    fn bind(&mut self, runtime: &Runtime, slice: SpecSlice) -> Result<(), EngineError>;

    async fn is_skip(&self, _ctx: &ExecutionContext) -> Result<bool, EngineError> {
        Ok(false)
    }

    async fn auto_assert(&self, _ctx: &ExecutionContext) -> Result<(), EngineError> {
        Ok(())
    }

    fn build_tasks(&self, _ctx: &ExecutionContext) -> Result<Vec<Box<dyn Task>>, EngineError> {
        Ok(Vec::new())
    }

    async fn init(&mut self, ctx: &ExecutionContext) -> Result<(), EngineError> {
        let tasks = self.build_tasks(ctx)?;
        self.base_mut().init_tasks(tasks, ctx).await
    }

    async fn run(&mut self, ctx: &ExecutionContext, result: &mut ModuleResult) {
        self.base_mut().run_tasks(ctx, result).await;
    }

    async fn until(&mut self, _ctx: &ExecutionContext) -> Result<bool, EngineError> {
        Ok(true)
    }

    async fn call_post_hook(&mut self, result: &ModuleResult) -> Result<(), EngineError> {
        self.base().call_post_hooks(result).await
    }
}

/// State and task plumbing shared by every module
pub struct BaseModule {
    name: String,
    description: String,
    kind: ModuleKind,
    tasks: Vec<Box<dyn Task>>,
    hooks: Vec<Box<dyn PostHook>>,
    span: Span,
}

impl BaseModule {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind: ModuleKind::Sequenced,
            tasks: Vec::new(),
            hooks: Vec::new(),
            span: Span::none(),
        }
    }

    pub fn with_kind(mut self, kind: ModuleKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Create the module-scoped span; called from `Module::bind`
    pub fn bind_span(&mut self) {
        self.span = info_span!("module", name = %self.name, kind = %self.kind);
    }

    pub fn add_hook(&mut self, hook: Box<dyn PostHook>) {
        self.hooks.push(hook);
    }

    pub fn hook_names(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }

    /// Bind and initialize each task, then adopt them
    pub async fn init_tasks(
        &mut self,
        mut tasks: Vec<Box<dyn Task>>,
        ctx: &ExecutionContext,
    ) -> Result<(), EngineError> {
        for task in tasks.iter_mut() {
            task.bind(ctx)?;
            task.init(ctx).await?;
        }
        debug!("Module {} initialized {} tasks", self.name, tasks.len());
        self.tasks = tasks;
        Ok(())
    }

    /// Run tasks in order under the same halting rule as steps
    pub async fn run_tasks(&mut self, ctx: &ExecutionContext, result: &mut ModuleResult) {
        let ignore_err = ctx.ignore_err();

        for task in self.tasks.iter_mut() {
            if !run_task(task.as_mut(), ctx, result).await && !ignore_err {
                break;
            }
        }
    }

    pub async fn call_post_hooks(&self, result: &ModuleResult) -> Result<(), EngineError> {
        run_post_hooks(&self.hooks, &self.name, result).await
    }
}

/// Drive one task through its run phases; `false` when it failed
async fn run_task(task: &mut dyn Task, ctx: &ExecutionContext, result: &mut ModuleResult) -> bool {
    let task_name = task.name().to_string();

    match task.is_skip(ctx).await {
        Ok(true) => {
            info!("Skipping task {}", task_name);
            return true;
        }
        Ok(false) => {}
        Err(e) => {
            result.add_error(EngineError::TaskFailed {
                task: task_name,
                reason: e.to_string(),
            });
            return false;
        }
    }

    if let Err(e) = task.auto_assert(ctx).await {
        result.add_error(EngineError::AssertionFailed {
            unit: task_name,
            reason: e.to_string(),
        });
        return false;
    }

    info!("Running task {}", task_name);
    let recorded = result.errors().len();
    task.run(ctx, result).await;
    if result.errors().len() > recorded {
        warn!("Task {} failed", task_name);
        return false;
    }

    match task.until(ctx).await {
        Ok(true) => true,
        Ok(false) => {
            result.add_error(EngineError::NotConverged { unit: task_name });
            false
        }
        Err(e) => {
            result.add_error(EngineError::TaskFailed {
                task: task_name,
                reason: e.to_string(),
            });
            false
        }
    }
}
