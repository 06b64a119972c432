//! Orchestration engine: pipeline → module → task → step

pub mod context;
pub mod error;
pub mod hook;
pub mod module;
pub mod pipeline;
pub mod registry;
pub mod result;
pub mod spec;
pub mod step;
pub mod task;

pub use context::ExecutionContext;
pub use error::EngineError;
pub use hook::{run_post_hooks, PostHook};
pub use module::{BaseModule, Module, ModuleKind};
pub use pipeline::{ModuleReport, Pipeline, PipelineReport};
pub use registry::{PipelineFactory, PipelineRegistry, RegistryError};
pub use result::{ModuleResult, ResultStatus};
pub use spec::SpecSlice;
pub use step::{Step, StepOutcome};
pub use task::{run_steps, StepTask, Task};
