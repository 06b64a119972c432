use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::engine::{EngineError, ModuleResult, PostHook};

/// Logs the final status of a module
pub struct LogResultHook;

#[async_trait]
impl PostHook for LogResultHook {
    fn name(&self) -> &str {
        "log-result"
    }

    async fn run(&self, module: &str, result: &ModuleResult) -> Result<(), EngineError> {
        if result.is_failed() {
            warn!(
                "[{}] {} with {} errors: {}",
                module,
                result.status(),
                result.errors().len(),
                result.message()
            );
        } else {
            info!("[{}] {}", module, result.status());
        }
        Ok(())
    }
}

/// Persists the result as `<dir>/<module>.json`
pub struct ResultFileHook {
    dir: PathBuf,
}

impl ResultFileHook {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn path_for(&self, module: &str) -> PathBuf {
        self.dir.join(format!("{module}.json"))
    }
}

#[async_trait]
impl PostHook for ResultFileHook {
    fn name(&self) -> &str {
        "result-file"
    }

    async fn run(&self, module: &str, result: &ModuleResult) -> Result<(), EngineError> {
        let io_error = |operation: &str, e: std::io::Error| EngineError::Io {
            operation: operation.to_string(),
            error: e.to_string(),
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error("create results dir", e))?;

        let json = serde_json::to_string_pretty(result).map_err(|e| EngineError::Io {
            operation: "serialize result".to_string(),
            error: e.to_string(),
        })?;

        tokio::fs::write(self.path_for(module), json)
            .await
            .map_err(|e| io_error("write result", e))
    }
}
