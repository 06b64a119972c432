use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::{load_cluster_spec, ConfigError};
use crate::engine::{EngineError, PipelineRegistry, PipelineReport, RegistryError};
use crate::runtime::{ConnectionError, Runtime, RuntimeArgs, RuntimeError, SshDialer};

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Pipeline failed: {0}")]
    Pipeline(#[from] EngineError),
}

impl CliError {
    /// Work-dir failures abort before any pipeline is built
    pub fn is_work_dir(&self) -> bool {
        matches!(self, CliError::Runtime(RuntimeError::WorkDir { .. }))
    }
}

/// Load the cluster definition, build the runtime and run `pipeline`
pub async fn run_pipeline(
    registry: &PipelineRegistry,
    pipeline: &str,
    cluster_file: &Path,
    args: RuntimeArgs,
) -> Result<PipelineReport, CliError> {
    if !registry.contains(pipeline) {
        return Err(RegistryError::NotFound {
            name: pipeline.to_string(),
            available: registry.names().into_iter().map(str::to_string).collect(),
        }
        .into());
    }

    let cluster = load_cluster_spec(cluster_file).await?;
    info!(
        "Loaded cluster {} with {} hosts",
        cluster.metadata.name,
        cluster.spec.hosts.len()
    );

    let dialer = Arc::new(SshDialer::new(args.control_dir(), args.connect_timeout)?);
    let runtime = Runtime::new(args, Some(cluster), dialer)?;
    runtime.ensure_work_dir().await?;

    let mut pipeline = registry.get_pipeline(pipeline, Arc::new(runtime))?;
    Ok(pipeline.start().await?)
}

pub fn list_pipelines(registry: &PipelineRegistry) -> Vec<&str> {
    registry.names()
}
