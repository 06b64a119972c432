use std::sync::Arc;
use tracing::debug;

use crate::engine::{EngineError, Pipeline, SpecSlice};
use crate::modules::{EtcdPreCheckModule, GreetingsModule, InternalLoadBalancerModule, NodePreCheckModule};
use crate::pipelines::{require_cluster, with_standard_hooks};
use crate::runtime::Runtime;

pub const CLUSTER_INSTALL: &str = "cluster-install";

/// Modules for bringing up a new cluster, in execution order
pub fn cluster_install(runtime: Arc<Runtime>) -> Result<Pipeline, EngineError> {
    let cluster = require_cluster(CLUSTER_INSTALL, &runtime)?;
    let mut pipeline = Pipeline::new(CLUSTER_INSTALL, Arc::clone(&runtime));

    pipeline.add_module(
        with_standard_hooks(GreetingsModule::new(), &runtime),
        SpecSlice::Empty,
    )?;
    pipeline.add_module(
        with_standard_hooks(NodePreCheckModule::new(), &runtime),
        SpecSlice::Cluster(Arc::clone(&cluster)),
    )?;
    pipeline.add_module(
        with_standard_hooks(EtcdPreCheckModule::new(), &runtime),
        SpecSlice::Etcd(cluster.spec.etcd.clone()),
    )?;

    let endpoint = &cluster.spec.control_plane_endpoint;
    if endpoint.internal_lb_enabled() && !endpoint.externally_managed() {
        pipeline.add_module(
            with_standard_hooks(InternalLoadBalancerModule::new(), &runtime),
            SpecSlice::ControlPlaneEndpoint(endpoint.clone()),
        )?;
    } else {
        debug!("Internal load balancer disabled for {}", cluster.metadata.name);
    }

    Ok(pipeline)
}
