//! Name → factory lookup for pipelines

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::engine::error::EngineError;
use crate::engine::pipeline::Pipeline;
use crate::runtime::context::Runtime;

pub type PipelineFactory =
    Arc<dyn Fn(Arc<Runtime>) -> Result<Pipeline, EngineError> + Send + Sync>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Pipeline already registered: {name}")]
    AlreadyRegistered { name: String },

    #[error("Pipeline not found: {name} (available: {available:?})")]
    NotFound {
        name: String,
        available: Vec<String>,
    },

    #[error("Failed to build pipeline {name}: {source}")]
    Factory {
        name: String,
        #[source]
        source: EngineError,
    },
}

/// Registry of pipeline factories; one per process entry point
pub struct PipelineRegistry {
    factories: HashMap<String, PipelineFactory>,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry with the built-in pipelines registered
    pub fn with_builtin_pipelines() -> Self {
        let mut registry = Self::new();

        for (name, factory) in crate::pipelines::builtin_factories() {
            if let Err(e) = registry.register(name, factory) {
                tracing::warn!("Skipping built-in pipeline: {}", e);
            }
        }

        registry
    }

    /// Register `factory` under `name`; an existing name is never replaced
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(Arc<Runtime>) -> Result<Pipeline, EngineError> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered { name });
        }
        self.factories.insert(name, Arc::new(factory));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build the pipeline registered under `name` against `runtime`
    pub fn get_pipeline(&self, name: &str, runtime: Arc<Runtime>) -> Result<Pipeline, RegistryError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
                available: self.names().into_iter().map(str::to_string).collect(),
            })?;

        factory(runtime).map_err(|source| RegistryError::Factory {
            name: name.to_string(),
            source,
        })
    }
}

impl Default for PipelineRegistry {
    fn default() -> Self {
        Self::new()
    }
}
