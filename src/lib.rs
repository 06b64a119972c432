//! Rustle Cluster - Declarative cluster provisioning engine
//!
//! A cluster definition is loaded into a [`runtime::Runtime`] which owns the
//! host inventory and one cached SSH connector per host. Named pipelines from
//! the [`engine::PipelineRegistry`] drive modules, tasks and steps against it.

pub mod cli;
pub mod config;
pub mod engine;
pub mod modules;
pub mod pipelines;
pub mod runtime;
pub mod types;

pub use config::{load_cluster_spec, parse_cluster_spec, ConfigError};
pub use engine::{EngineError, Pipeline, PipelineRegistry, PipelineReport};
pub use runtime::{Runtime, RuntimeArgs};
pub use types::*;
