//! Pipeline: drives an ordered list of modules against one runtime

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

use crate::engine::context::ExecutionContext;
use crate::engine::error::EngineError;
use crate::engine::module::{Module, ModuleKind};
use crate::engine::result::{ModuleResult, ResultStatus};
use crate::engine::spec::SpecSlice;
use crate::runtime::context::Runtime;

pub struct Pipeline {
    name: String,
    runtime: Arc<Runtime>,
    modules: Vec<Box<dyn Module>>,
}

/// Per-module outcome of a pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct ModuleReport {
    pub module: String,
    pub kind: ModuleKind,
    pub result: ModuleResult,
    #[serde(serialize_with = "serialize_hook_error")]
    pub hook_error: Option<EngineError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub pipeline: String,
    pub modules: Vec<ModuleReport>,
}

impl PipelineReport {
    pub fn failed_modules(&self) -> impl Iterator<Item = &ModuleReport> {
        self.modules.iter().filter(|m| m.result.is_failed())
    }

    pub fn is_success(&self) -> bool {
        self.failed_modules().next().is_none()
    }

    pub fn module(&self, name: &str) -> Option<&ModuleReport> {
        self.modules.iter().find(|m| m.module == name)
    }
}

impl Pipeline {
    pub fn new(name: impl Into<String>, runtime: Arc<Runtime>) -> Self {
        Self {
            name: name.into(),
            runtime,
            modules: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// Bind `module` to `slice` and append it. A bind failure is returned
    /// and the module is dropped.
    pub fn add_module(
        &mut self,
        mut module: Box<dyn Module>,
        slice: SpecSlice,
    ) -> Result<(), EngineError> {
        module.bind(&self.runtime, slice)?;
        self.modules.push(module);
        Ok(())
    }

    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    /// Run every module in order.
    ///
    /// A failed module ends the run unless ignore-error is set; connectors
    /// and the pipeline cache are released on every exit path.
    pub async fn start(&mut self) -> Result<PipelineReport, EngineError> {
        let span = info_span!("pipeline", name = %self.name);
        let outcome = self.execute().instrument(span.clone()).await;
        self.runtime.teardown().instrument(span).await;
        outcome
    }

    async fn execute(&mut self) -> Result<PipelineReport, EngineError> {
        let ignore_err = self.runtime.ignore_err();
        let mut report = PipelineReport {
            pipeline: self.name.clone(),
            modules: Vec::with_capacity(self.modules.len()),
        };

        info!("Starting pipeline {} with {} modules", self.name, self.modules.len());

        for module in self.modules.iter_mut() {
            let span = module.span();
            let module_report = run_module(module.as_mut(), &self.runtime)
                .instrument(span)
                .await;

            let failure = module_report.result.is_failed().then(|| {
                module_report
                    .result
                    .combined_error()
                    .unwrap_or_else(|| EngineError::Failed {
                        unit: module_report.module.clone(),
                        reason: module_report.result.message().to_string(),
                    })
            });
            let hook_error = module_report.hook_error.clone();
            let module_name = module_report.module.clone();
            report.modules.push(module_report);

            if let Some(source) = failure {
                if !ignore_err {
                    error!("Module {} failed, halting pipeline", module_name);
                    return Err(EngineError::ModuleFailed {
                        module: module_name,
                        source: Box::new(source),
                    });
                }
                warn!("Module {} failed, continuing: {}", module_name, source);
            }

            if let Some(hook_error) = hook_error {
                if !ignore_err {
                    return Err(hook_error);
                }
                warn!("{}", hook_error);
            }
        }

        for failed in report.failed_modules() {
            warn!(
                "Module {} ended {}: {}",
                failed.module,
                failed.result.status(),
                failed.result.message()
            );
        }
        info!("Pipeline {} finished", self.name);
        Ok(report)
    }
}

/// Drive one module through its lifecycle with a fresh module cache
async fn run_module(module: &mut dyn Module, runtime: &Arc<Runtime>) -> ModuleReport {
    let ctx = ExecutionContext::new(Arc::clone(runtime));
    let mut result = ModuleResult::new();
    let name = module.name().to_string();

    info!("[{}] {}", name, module.description());

    match module.is_skip(&ctx).await {
        Ok(true) => {
            info!("Skipping module {}", name);
            result.set_status(ResultStatus::Skipped, "skipped");
        }
        Ok(false) => drive(module, &ctx, &mut result).await,
        Err(e) => result.add_error(e),
    }

    result.finish();

    let hook_error = module.call_post_hook(&result).await.err();

    ModuleReport {
        module: name,
        kind: module.kind(),
        result,
        hook_error,
    }
}

async fn drive(module: &mut dyn Module, ctx: &ExecutionContext, result: &mut ModuleResult) {
    if let Err(e) = module.auto_assert(ctx).await {
        result.add_error(e);
        return;
    }

    if let Err(e) = module.init(ctx).await {
        result.add_error(e);
        return;
    }

    module.run(ctx, result).await;
    if result.is_failed() {
        return;
    }

    match module.until(ctx).await {
        Ok(true) => {}
        Ok(false) => result.add_error(EngineError::NotConverged {
            unit: module.name().to_string(),
        }),
        Err(e) => result.add_error(e),
    }
}

fn serialize_hook_error<S>(error: &Option<EngineError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}
