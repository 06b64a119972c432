use async_trait::async_trait;

use crate::engine::error::EngineError;
use crate::engine::result::ModuleResult;

/// Runs against a module's final result, whatever its status
#[async_trait]
pub trait PostHook: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, module: &str, result: &ModuleResult) -> Result<(), EngineError>;
}

/// Run every hook in order; the first error is returned after all have run
pub async fn run_post_hooks(
    hooks: &[Box<dyn PostHook>],
    module: &str,
    result: &ModuleResult,
) -> Result<(), EngineError> {
    let mut first_error = None;

    for hook in hooks {
        if let Err(e) = hook.run(module, result).await {
            tracing::warn!("Post hook {} failed for {}: {}", hook.name(), module, e);
            first_error.get_or_insert(EngineError::PostHook {
                module: module.to_string(),
                hook: hook.name().to_string(),
                reason: e.to_string(),
            });
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
