//! Step: the smallest unit of work

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::engine::context::ExecutionContext;
use crate::engine::error::EngineError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub output: String,
    pub success: bool,
}

impl StepOutcome {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: true,
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: false,
        }
    }
}

#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &str;

    async fn init(&mut self, _ctx: &ExecutionContext) -> Result<(), EngineError> {
        Ok(())
    }

    async fn execute(&mut self, ctx: &ExecutionContext) -> Result<StepOutcome, EngineError>;

    /// Always called after `execute`, with its error if it had one
    async fn post(
        &mut self,
        _ctx: &ExecutionContext,
        _exec_error: Option<&EngineError>,
    ) -> Result<(), EngineError> {
        Ok(())
    }
}
