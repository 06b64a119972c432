use std::sync::Arc;

use crate::runtime::cache::Cache;
use crate::runtime::context::Runtime;

/// What a task or step sees while its module executes
#[derive(Clone)]
pub struct ExecutionContext {
    pub runtime: Arc<Runtime>,
    /// Lives for the whole pipeline run
    pub pipeline_cache: Cache,
    /// Created before the module executes, dropped after
    pub module_cache: Cache,
}

impl ExecutionContext {
    pub fn new(runtime: Arc<Runtime>) -> Self {
        let pipeline_cache = runtime.pipeline_cache().clone();
        let module_cache = runtime.new_module_cache();
        Self {
            runtime,
            pipeline_cache,
            module_cache,
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn ignore_err(&self) -> bool {
        self.runtime.ignore_err()
    }
}
