use std::sync::Arc;

use crate::engine::{EngineError, Pipeline, SpecSlice};
use crate::modules::{EtcdPreCheckModule, GreetingsModule, NodePreCheckModule};
use crate::pipelines::{require_cluster, with_standard_hooks};
use crate::runtime::Runtime;

pub const CLUSTER_PRECHECK: &str = "cluster-precheck";

/// Read-only checks; safe to run against a live cluster
pub fn cluster_precheck(runtime: Arc<Runtime>) -> Result<Pipeline, EngineError> {
    let cluster = require_cluster(CLUSTER_PRECHECK, &runtime)?;
    let mut pipeline = Pipeline::new(CLUSTER_PRECHECK, Arc::clone(&runtime));

    pipeline.add_module(
        with_standard_hooks(GreetingsModule::new(), &runtime),
        SpecSlice::Empty,
    )?;
    pipeline.add_module(
        with_standard_hooks(NodePreCheckModule::new(), &runtime),
        SpecSlice::Cluster(Arc::clone(&cluster)),
    )?;

    if cluster.spec.etcd.is_external() {
        pipeline.add_module(
            with_standard_hooks(EtcdPreCheckModule::new(), &runtime),
            SpecSlice::Etcd(cluster.spec.etcd.clone()),
        )?;
    }

    Ok(pipeline)
}
