use async_trait::async_trait;

use crate::engine::{BaseModule, EngineError, ExecutionContext, Module, SpecSlice, StepTask, Task};
use crate::modules::steps::{HostSelector, RemoteCommandStep};
use crate::runtime::Runtime;

/// Reaches every host once so connection problems surface before any change
pub struct GreetingsModule {
    base: BaseModule,
}

impl GreetingsModule {
    pub fn new() -> Self {
        Self {
            base: BaseModule::new("greetings", "Greetings"),
        }
    }
}

impl Default for GreetingsModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for GreetingsModule {
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

    async fn auto_assert(&self, ctx: &ExecutionContext) -> Result<(), EngineError> {
        if ctx.runtime().hosts().is_empty() {
            return Err(EngineError::AssertionFailed {
                unit: self.base.name().to_string(),
                reason: "no hosts defined".to_string(),
            });
        }
        Ok(())
    }

    fn build_tasks(&self, _ctx: &ExecutionContext) -> Result<Vec<Box<dyn Task>>, EngineError> {
        let greet = StepTask::new("greetings", "Say hello to every host").with_step(
            RemoteCommandStep::new(
                "echo",
                "echo 'Greetings, rustle-cluster!'",
                HostSelector::All,
            ),
        );
        Ok(vec![Box::new(greet)])
    }
}
