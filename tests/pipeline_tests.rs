mod common;

use async_trait::async_trait;
use common::*;
use rustle_cluster::engine::{
    BaseModule, EngineError, ExecutionContext, Module, ModuleKind, ModuleResult, Pipeline,
    PostHook, ResultStatus, SpecSlice, Step, StepOutcome, StepTask, Task,
};
use rustle_cluster::modules::{GreetingsModule, HostSelector, RemoteCommandStep};
use rustle_cluster::runtime::{Runtime, RuntimeArgs};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

type Journal = Arc<Mutex<Vec<String>>>;

struct MarkStep {
    mark: String,
    fail: bool,
    journal: Journal,
}

#[async_trait]
impl Step for MarkStep {
    fn name(&self) -> &str {
        &self.mark
    }

    async fn execute(&mut self, _ctx: &ExecutionContext) -> Result<StepOutcome, EngineError> {
        self.journal.lock().unwrap().push(self.mark.clone());
        if self.fail {
            Ok(StepOutcome::failed("broken"))
        } else {
            Ok(StepOutcome::ok("marked"))
        }
    }
}

struct RecordingHook {
    seen: Arc<Mutex<Vec<(String, ResultStatus)>>>,
    fail: bool,
}

#[async_trait]
impl PostHook for RecordingHook {
    fn name(&self) -> &str {
        "recording"
    }

    async fn run(&self, module: &str, result: &ModuleResult) -> Result<(), EngineError> {
        self.seen
            .lock()
            .unwrap()
            .push((module.to_string(), result.status()));
        if self.fail {
            return Err(EngineError::Io {
                operation: "publish result".to_string(),
                error: "disk full".to_string(),
            });
        }
        Ok(())
    }
}

struct ScriptedModule {
    base: BaseModule,
    journal: Journal,
    skip: bool,
    fail: bool,
    converged: bool,
    touch_hosts: bool,
}

impl ScriptedModule {
    fn new(name: &str, journal: &Journal) -> Self {
        Self {
            base: BaseModule::new(name, format!("Scripted {name}")),
            journal: Arc::clone(journal),
            skip: false,
            fail: false,
            converged: true,
            touch_hosts: false,
        }
    }

    fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }

    fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    fn never_converging(mut self) -> Self {
        self.converged = false;
        self.base = BaseModule::new(self.base.name().to_string(), "background")
            .with_kind(ModuleKind::Background);
        self
    }

    fn touching_hosts(mut self) -> Self {
        self.touch_hosts = true;
        self
    }

    fn with_hook(mut self, hook: RecordingHook) -> Self {
        self.base.add_hook(Box::new(hook));
        self
    }
}

#[async_trait]
impl Module for ScriptedModule {
    fn base(&self) -> &BaseModule {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseModule {
        &mut self.base
    }

    fn bind(&mut self, _runtime: &Runtime, slice: SpecSlice) -> Result<(), EngineError> {
        slice.expect_empty(self.base.name())?;
        self.base.bind_span();
        Ok(())
    }

    async fn is_skip(&self, _ctx: &ExecutionContext) -> Result<bool, EngineError> {
        Ok(self.skip)
    }

    fn build_tasks(&self, _ctx: &ExecutionContext) -> Result<Vec<Box<dyn Task>>, EngineError> {
        let mut task = StepTask::new(format!("{}-task", self.base.name()), "").with_step(MarkStep {
            mark: self.base.name().to_string(),
            fail: self.fail,
            journal: Arc::clone(&self.journal),
        });
        if self.touch_hosts {
            task = task.with_step(RemoteCommandStep::new("uptime", "uptime", HostSelector::All));
        }
        Ok(vec![Box::new(task)])
    }

    async fn until(&mut self, _ctx: &ExecutionContext) -> Result<bool, EngineError> {
        Ok(self.converged)
    }
}

/// Journals `<mark>:<visited>` where `visited` says whether an earlier step
/// of the same module already wrote to the module cache
struct ModuleCacheStep {
    mark: String,
    fail: bool,
    journal: Journal,
}

#[async_trait]
impl Step for ModuleCacheStep {
    fn name(&self) -> &str {
        &self.mark
    }

    async fn execute(&mut self, ctx: &ExecutionContext) -> Result<StepOutcome, EngineError> {
        let visited = ctx.module_cache.contains("visited").await;
        self.journal
            .lock()
            .unwrap()
            .push(format!("{}:{visited}", self.mark));
        ctx.module_cache
            .set("visited", serde_json::json!(self.mark))
            .await;
        if self.fail {
            Ok(StepOutcome::failed("broken"))
        } else {
            Ok(StepOutcome::ok("marked"))
        }
    }
}

/// Two tasks, the first one failing
struct TwoTaskModule {
    base: BaseModule,
    journal: Journal,
}

impl TwoTaskModule {
    fn new(name: &str, journal: &Journal) -> Self {
        Self {
            base: BaseModule::new(name, format!("Two tasks in {name}")),
            journal: Arc::clone(journal),
        }
    }
}

#[async_trait]
impl Module for TwoTaskModule {
    fn base(&self) -> &BaseModule {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseModule {
        &mut self.base
    }

    fn bind(&mut self, _runtime: &Runtime, slice: SpecSlice) -> Result<(), EngineError> {
        slice.expect_empty(self.base.name())?;
        self.base.bind_span();
        Ok(())
    }

    fn build_tasks(&self, _ctx: &ExecutionContext) -> Result<Vec<Box<dyn Task>>, EngineError> {
        let tasks = [("t1", true), ("t2", false)]
            .into_iter()
            .map(|(task, fail)| {
                let mark = format!("{}-{task}", self.base.name());
                Box::new(StepTask::new(mark.clone(), "").with_step(ModuleCacheStep {
                    mark,
                    fail,
                    journal: Arc::clone(&self.journal),
                })) as Box<dyn Task>
            })
            .collect();
        Ok(tasks)
    }
}

fn hook(seen: &Arc<Mutex<Vec<(String, ResultStatus)>>>, fail: bool) -> RecordingHook {
    RecordingHook {
        seen: Arc::clone(seen),
        fail,
    }
}

#[tokio::test]
async fn test_modules_run_in_order() {
    let dir = TempDir::new().unwrap();
    let dialer = MockDialer::new();
    let runtime = test_runtime(&dialer, dir.path(), false);
    let journal = Journal::default();

    let mut pipeline = Pipeline::new("ordered", runtime);
    for name in ["one", "two", "three"] {
        pipeline
            .add_module(Box::new(ScriptedModule::new(name, &journal)), SpecSlice::Empty)
            .unwrap();
    }
    assert_eq!(pipeline.module_names(), vec!["one", "two", "three"]);

    let report = pipeline.start().await.unwrap();
    assert!(report.is_success());
    assert_eq!(*journal.lock().unwrap(), vec!["one", "two", "three"]);
    assert_eq!(
        report.module("two").unwrap().result.status(),
        ResultStatus::Success
    );
}

#[tokio::test]
async fn test_skipped_module_still_calls_hooks() {
    let dir = TempDir::new().unwrap();
    let dialer = MockDialer::new();
    let runtime = test_runtime(&dialer, dir.path(), false);
    let journal = Journal::default();
    let seen = Arc::default();

    let mut pipeline = Pipeline::new("skip", runtime);
    pipeline
        .add_module(
            Box::new(
                ScriptedModule::new("optional", &journal)
                    .skipped()
                    .with_hook(hook(&seen, false)),
            ),
            SpecSlice::Empty,
        )
        .unwrap();

    let report = pipeline.start().await.unwrap();

    assert!(journal.lock().unwrap().is_empty());
    assert!(report.module("optional").unwrap().result.is_skipped());
    assert_eq!(
        *seen.lock().unwrap(),
        vec![("optional".to_string(), ResultStatus::Skipped)]
    );
}

#[tokio::test]
async fn test_failed_module_halts_pipeline() {
    let dir = TempDir::new().unwrap();
    let dialer = MockDialer::new();
    let runtime = test_runtime(&dialer, dir.path(), false);
    let journal = Journal::default();
    let seen = Arc::default();

    let mut pipeline = Pipeline::new("halting", runtime);
    pipeline
        .add_module(
            Box::new(
                ScriptedModule::new("broken", &journal)
                    .failing()
                    .with_hook(hook(&seen, false)),
            ),
            SpecSlice::Empty,
        )
        .unwrap();
    pipeline
        .add_module(Box::new(ScriptedModule::new("after", &journal)), SpecSlice::Empty)
        .unwrap();

    let err = pipeline.start().await.unwrap_err();
    match err {
        EngineError::ModuleFailed { module, source } => {
            assert_eq!(module, "broken");
            assert!(matches!(*source, EngineError::StepFailed { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(*journal.lock().unwrap(), vec!["broken"]);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![("broken".to_string(), ResultStatus::Failed)]
    );
}

#[tokio::test]
async fn test_failed_module_continues_with_ignore() {
    let dir = TempDir::new().unwrap();
    let dialer = MockDialer::new();
    let runtime = test_runtime(&dialer, dir.path(), true);
    let journal = Journal::default();

    let mut pipeline = Pipeline::new("lenient", runtime);
    pipeline
        .add_module(
            Box::new(ScriptedModule::new("broken", &journal).failing()),
            SpecSlice::Empty,
        )
        .unwrap();
    pipeline
        .add_module(Box::new(ScriptedModule::new("after", &journal)), SpecSlice::Empty)
        .unwrap();

    let report = pipeline.start().await.unwrap();

    assert_eq!(*journal.lock().unwrap(), vec!["broken", "after"]);
    assert!(!report.is_success());
    let failed: Vec<&str> = report.failed_modules().map(|m| m.module.as_str()).collect();
    assert_eq!(failed, vec!["broken"]);
    assert_eq!(
        report.module("after").unwrap().result.status(),
        ResultStatus::Success
    );
}

#[tokio::test]
async fn test_failed_task_halts_module() {
    let dir = TempDir::new().unwrap();
    let dialer = MockDialer::new();
    let journal = Journal::default();

    let mut pipeline = Pipeline::new("tasks", test_runtime(&dialer, dir.path(), false));
    for name in ["a", "b"] {
        pipeline
            .add_module(Box::new(TwoTaskModule::new(name, &journal)), SpecSlice::Empty)
            .unwrap();
    }

    let err = pipeline.start().await.unwrap_err();
    assert!(matches!(err, EngineError::ModuleFailed { ref module, .. } if module == "a"));
    assert_eq!(*journal.lock().unwrap(), vec!["a-t1:false"]);
}

#[tokio::test]
async fn test_failed_task_continues_with_ignore_and_module_cache_is_fresh() {
    let dir = TempDir::new().unwrap();
    let dialer = MockDialer::new();
    let runtime = test_runtime(&dialer, dir.path(), true);
    let journal = Journal::default();

    let mut pipeline = Pipeline::new("tasks", Arc::clone(&runtime));
    for name in ["a", "b"] {
        pipeline
            .add_module(Box::new(TwoTaskModule::new(name, &journal)), SpecSlice::Empty)
            .unwrap();
    }

    let report = pipeline.start().await.unwrap();

    // t2 sees what t1 cached; module b starts with an empty module cache
    assert_eq!(
        *journal.lock().unwrap(),
        vec!["a-t1:false", "a-t2:true", "b-t1:false", "b-t2:true"]
    );
    for name in ["a", "b"] {
        let result = &report.module(name).unwrap().result;
        assert!(result.is_failed());
        assert_eq!(result.errors().len(), 1);
    }
    assert!(!runtime.pipeline_cache().contains("visited").await);
}

#[tokio::test]
async fn test_teardown_closes_connectors_on_success_and_failure() {
    for fail in [false, true] {
        let dir = TempDir::new().unwrap();
        let dialer = MockDialer::new();
        let runtime = test_runtime(&dialer, dir.path(), false);
        let journal = Journal::default();

        let mut module = ScriptedModule::new("remote", &journal).touching_hosts();
        if fail {
            module = module.failing();
        }
        // A failing module stops before its remote step, so open one up front
        if fail {
            let node1 = Arc::clone(runtime.host("node1").unwrap());
            runtime.get_connector(&node1).await.unwrap();
        }

        let mut pipeline = Pipeline::new("teardown", Arc::clone(&runtime));
        pipeline.add_module(Box::new(module), SpecSlice::Empty).unwrap();
        let outcome = pipeline.start().await;

        assert_eq!(outcome.is_err(), fail);
        assert_eq!(runtime.connector_count().await, 0);
        assert_eq!(dialer.closes(), dialer.dials());
        assert!(dialer.dials() > 0);
        assert!(runtime.pipeline_cache().is_empty().await);
    }
}

#[tokio::test]
async fn test_hook_error_is_surfaced_without_touching_status() {
    let dir = TempDir::new().unwrap();
    let dialer = MockDialer::new();
    let journal = Journal::default();
    let seen = Arc::default();

    let mut pipeline = Pipeline::new("hooks", test_runtime(&dialer, dir.path(), false));
    pipeline
        .add_module(
            Box::new(
                ScriptedModule::new("noisy", &journal)
                    .with_hook(hook(&seen, true))
                    .with_hook(hook(&seen, false)),
            ),
            SpecSlice::Empty,
        )
        .unwrap();

    let err = pipeline.start().await.unwrap_err();
    assert!(matches!(err, EngineError::PostHook { ref hook, .. } if hook == "recording"));
    // Every hook still ran
    assert_eq!(seen.lock().unwrap().len(), 2);

    let mut lenient = Pipeline::new("hooks", test_runtime(&dialer, dir.path(), true));
    lenient
        .add_module(
            Box::new(ScriptedModule::new("noisy", &journal).with_hook(hook(&seen, true))),
            SpecSlice::Empty,
        )
        .unwrap();

    let report = lenient.start().await.unwrap();
    let noisy = report.module("noisy").unwrap();
    assert!(noisy.hook_error.is_some());
    assert_eq!(noisy.result.status(), ResultStatus::Success);
}

#[tokio::test]
async fn test_background_module_not_converging() {
    let dir = TempDir::new().unwrap();
    let dialer = MockDialer::new();
    let journal = Journal::default();

    let mut pipeline = Pipeline::new("background", test_runtime(&dialer, dir.path(), true));
    pipeline
        .add_module(
            Box::new(ScriptedModule::new("lb", &journal).never_converging()),
            SpecSlice::Empty,
        )
        .unwrap();

    let report = pipeline.start().await.unwrap();
    let lb = report.module("lb").unwrap();
    assert_eq!(lb.kind, ModuleKind::Background);
    assert_eq!(
        lb.result.errors(),
        &[EngineError::NotConverged {
            unit: "lb".to_string()
        }]
    );
}

#[test]
fn test_wrong_spec_slice_fails_at_bind() {
    let dir = TempDir::new().unwrap();
    let dialer = MockDialer::new();
    let runtime = test_runtime(&dialer, dir.path(), false);
    let cluster = Arc::clone(runtime.cluster().unwrap());

    let mut pipeline = Pipeline::new("shape", runtime);
    let err = pipeline
        .add_module(Box::new(GreetingsModule::new()), SpecSlice::Cluster(cluster))
        .unwrap_err();

    assert_eq!(
        err,
        EngineError::SpecShape {
            unit: "greetings".to_string(),
            expected: "empty",
            found: "cluster",
        }
    );
    assert!(pipeline.module_names().is_empty());
}

#[tokio::test]
async fn test_failed_assertion_records_error_and_runs_hooks() {
    let seen = Arc::default();
    let runtime = Arc::new(
        Runtime::new(RuntimeArgs::default(), None, Arc::new(MockDialer::new())).unwrap(),
    );

    let mut greetings = GreetingsModule::new();
    greetings.base_mut().add_hook(Box::new(hook(&seen, false)));

    let mut pipeline = Pipeline::new("empty", runtime);
    pipeline
        .add_module(Box::new(greetings), SpecSlice::Empty)
        .unwrap();

    let err = pipeline.start().await.unwrap_err();
    match err {
        EngineError::ModuleFailed { source, .. } => {
            assert!(matches!(*source, EngineError::AssertionFailed { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        *seen.lock().unwrap(),
        vec![("greetings".to_string(), ResultStatus::Failed)]
    );
}
