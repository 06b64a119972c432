//! Internal haproxy load balancer in front of the control plane
//!
//! Every worker runs a local haproxy that forwards the control-plane domain
//! to all control-plane nodes, so workers need no external endpoint.

use async_trait::async_trait;
use handlebars::Handlebars;
use serde_json::json;
use tracing::debug;

use crate::engine::{
    BaseModule, EngineError, ExecutionContext, Module, ModuleKind, SpecSlice, StepTask, Task,
};
use crate::modules::steps::{sudo_command, HostSelector, RemoteCommandStep, UploadStep};
use crate::runtime::Runtime;
use crate::types::cluster::{ControlPlaneEndpoint, ROLE_CONTROL_PLANE, ROLE_WORKER};

pub const HAPROXY_CONFIG_DIR: &str = "/etc/kubekey/haproxy";
pub const HAPROXY_STAGING_PATH: &str = "/tmp/rustle-cluster/haproxy.cfg";
pub const HAPROXY_HEALTH_PORT: u16 = 8081;

const HAPROXY_TEMPLATE: &str = r#"global
    maxconn 4000
    log 127.0.0.1 local0

defaults
    mode http
    log global
    option httplog
    option dontlognull
    retries 5
    timeout connect 5s
    timeout client 30s
    timeout server 15m

frontend healthz
    bind *:{{health_port}}
    mode http
    monitor-uri /healthz

frontend kube_api_frontend
    bind 127.0.0.1:{{port}}
    mode tcp
    option tcplog
    default_backend kube_api_backend

backend kube_api_backend
    mode tcp
    balance leastconn
    default-server inter 15s downinter 15s rise 2 fall 2 slowstart 60s maxconn 1000 maxqueue 256 weight 100
    option httpchk GET /healthz
    http-check expect status 200
{{#each servers}}
    server {{this.name}} {{this.address}}:{{../port}} check check-ssl verify none
{{/each}}
"#;

pub struct InternalLoadBalancerModule {
    base: BaseModule,
    endpoint: Option<ControlPlaneEndpoint>,
}

impl InternalLoadBalancerModule {
    pub fn new() -> Self {
        Self {
            base: BaseModule::new("internal-lb", "Install internal load balancer")
                .with_kind(ModuleKind::Background),
            endpoint: None,
        }
    }

    fn endpoint(&self) -> Result<&ControlPlaneEndpoint, EngineError> {
        self.endpoint
            .as_ref()
            .ok_or_else(|| EngineError::InitFailed {
                unit: self.base.name().to_string(),
                reason: "module is not bound".to_string(),
            })
    }

    /// Render the haproxy configuration for the bound endpoint
    pub fn render_config(&self, runtime: &Runtime) -> Result<String, EngineError> {
        let endpoint = self.endpoint()?;
        let servers: Vec<_> = runtime
            .hosts_with_role(ROLE_CONTROL_PLANE)
            .iter()
            .map(|h| json!({ "name": h.name, "address": h.internal_address }))
            .collect();

        let data = json!({
            "port": endpoint.api_server_port(),
            "health_port": HAPROXY_HEALTH_PORT,
            "servers": servers,
        });

        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars
            .render_template(HAPROXY_TEMPLATE, &data)
            .map_err(|e| EngineError::Template {
                template: "haproxy.cfg".to_string(),
                reason: e.to_string(),
            })
    }
}

impl Default for InternalLoadBalancerModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for InternalLoadBalancerModule {
    fn base(&self) -> &BaseModule {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseModule {
        &mut self.base
    }

    fn bind(&mut self, _runtime: &Runtime, slice: SpecSlice) -> Result<(), EngineError> {
        self.endpoint = Some(slice.into_control_plane_endpoint(self.base.name())?);
        self.base.bind_span();
        Ok(())
    }

    async fn is_skip(&self, _ctx: &ExecutionContext) -> Result<bool, EngineError> {
        let endpoint = self.endpoint()?;
        Ok(!endpoint.internal_lb_enabled() || endpoint.externally_managed())
    }

    async fn auto_assert(&self, ctx: &ExecutionContext) -> Result<(), EngineError> {
        for role in [ROLE_CONTROL_PLANE, ROLE_WORKER] {
            if ctx.runtime().hosts_with_role(role).is_empty() {
                return Err(EngineError::AssertionFailed {
                    unit: self.base.name().to_string(),
                    reason: format!("no host carries the {role} role"),
                });
            }
        }
        Ok(())
    }

    fn build_tasks(&self, ctx: &ExecutionContext) -> Result<Vec<Box<dyn Task>>, EngineError> {
        let config = self.render_config(ctx.runtime())?;
        let domain = self.endpoint()?.domain.clone();
        let workers = HostSelector::role(ROLE_WORKER);

        let install = StepTask::new("haproxy-config", "Distribute haproxy configuration")
            .with_step(RemoteCommandStep::new(
                "staging-dir",
                "mkdir -p /tmp/rustle-cluster",
                workers.clone(),
            ))
            .with_step(UploadStep::new(
                "upload-config",
                config,
                HAPROXY_STAGING_PATH,
                workers.clone(),
            ))
            .with_step(
                RemoteCommandStep::new(
                    "install-config",
                    format!(
                        "mkdir -p {HAPROXY_CONFIG_DIR} && mv -f {HAPROXY_STAGING_PATH} {HAPROXY_CONFIG_DIR}/haproxy.cfg"
                    ),
                    workers.clone(),
                )
                .sudo(),
            );

        let hosts_entry = StepTask::new("lb-hosts-entry", "Point the control-plane domain at the local balancer")
            .with_step(
                RemoteCommandStep::new(
                    "hosts-entry",
                    format!(
                        "grep -q ' {domain}$' /etc/hosts || echo '127.0.0.1 {domain}' >> /etc/hosts"
                    ),
                    workers,
                )
                .sudo(),
            );

        Ok(vec![Box::new(install), Box::new(hosts_entry)])
    }

    async fn until(&mut self, ctx: &ExecutionContext) -> Result<bool, EngineError> {
        let check = sudo_command(&format!("test -f {HAPROXY_CONFIG_DIR}/haproxy.cfg"));
        for host in ctx.runtime().hosts_with_role(ROLE_WORKER) {
            let connector = ctx.runtime().get_connector(host).await?;
            if !connector.exec(&check).await?.success {
                debug!("haproxy config not yet present on {}", host.name);
                return Ok(false);
            }
        }
        Ok(true)
    }
}
