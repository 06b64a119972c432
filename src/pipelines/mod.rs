//! Built-in pipelines

pub mod install;
pub mod precheck;

use std::sync::Arc;

use crate::engine::{EngineError, Module, Pipeline};
use crate::modules::{LogResultHook, ResultFileHook};
use crate::runtime::Runtime;
use crate::types::cluster::ClusterSpec;

pub use install::{cluster_install, CLUSTER_INSTALL};
pub use precheck::{cluster_precheck, CLUSTER_PRECHECK};

pub type BuiltinFactory = fn(Arc<Runtime>) -> Result<Pipeline, EngineError>;

pub fn builtin_factories() -> Vec<(&'static str, BuiltinFactory)> {
    vec![
        (CLUSTER_INSTALL, cluster_install as BuiltinFactory),
        (CLUSTER_PRECHECK, cluster_precheck as BuiltinFactory),
    ]
}

/// The cluster definition a pipeline needs; its absence is fatal
fn require_cluster(pipeline: &str, runtime: &Runtime) -> Result<Arc<ClusterSpec>, EngineError> {
    runtime
        .cluster()
        .cloned()
        .ok_or_else(|| EngineError::MissingClusterSpec {
            pipeline: pipeline.to_string(),
        })
}

/// Attach the hooks every built-in module reports through
fn with_standard_hooks<M: Module + 'static>(mut module: M, runtime: &Runtime) -> Box<dyn Module> {
    module.base_mut().add_hook(Box::new(LogResultHook));
    module
        .base_mut()
        .add_hook(Box::new(ResultFileHook::new(runtime.args().results_dir())));
    Box::new(module)
}
