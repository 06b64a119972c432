use thiserror::Error;

use crate::runtime::error::ConnectionError;

/// Errors raised while building or driving a pipeline.
///
/// Payloads are strings so results can be cloned into reports and hooks.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("{unit} expects a {expected} spec, got {found}")]
    SpecShape {
        unit: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Pipeline {pipeline} requires a cluster definition")]
    MissingClusterSpec { pipeline: String },

    #[error("Precondition failed for {unit}: {reason}")]
    AssertionFailed { unit: String, reason: String },

    #[error("Initialization failed for {unit}: {reason}")]
    InitFailed { unit: String, reason: String },

    #[error("Step {step} of task {task} failed: {reason}")]
    StepFailed {
        task: String,
        step: String,
        reason: String,
    },

    #[error("Task {task} failed: {reason}")]
    TaskFailed { task: String, reason: String },

    #[error("{unit} failed: {reason}")]
    Failed { unit: String, reason: String },

    #[error("{unit} did not converge")]
    NotConverged { unit: String },

    #[error("Module {module} failed: {source}")]
    ModuleFailed {
        module: String,
        #[source]
        source: Box<EngineError>,
    },

    #[error("Post hook {hook} failed for module {module}: {reason}")]
    PostHook {
        module: String,
        hook: String,
        reason: String,
    },

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Cache error for key {key}: {reason}")]
    Cache { key: String, reason: String },

    #[error("Template error in {template}: {reason}")]
    Template { template: String, reason: String },

    #[error("I/O error during {operation}: {error}")]
    Io { operation: String, error: String },

    #[error("{count} errors occurred:{summary}")]
    Combined { count: usize, summary: String },
}

impl EngineError {
    /// Fold errors into one, preserving order.
    ///
    /// Returns `None` for an empty list and the error itself when there is
    /// exactly one.
    pub fn combine(errors: &[EngineError]) -> Option<EngineError> {
        match errors {
            [] => None,
            [single] => Some(single.clone()),
            many => {
                let summary: String = many.iter().map(|e| format!("\n\t* {e}")).collect();
                Some(EngineError::Combined {
                    count: many.len(),
                    summary,
                })
            }
        }
    }
}
