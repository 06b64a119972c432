//! Node dependency probe

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::engine::{
    BaseModule, EngineError, ExecutionContext, Module, SpecSlice, Step, StepOutcome, StepTask,
    Task,
};
use crate::modules::steps::{HostSelector, RemoteCommandStep};
use crate::runtime::{CommandOutput, Runtime};
use crate::types::cluster::ClusterSpec;

pub const NODE_PRECHECK_KEY: &str = "node-precheck";
pub const NODE_PRECHECK_REPORT_KEY: &str = "node-precheck-report";

/// Without these the later modules cannot run at all
pub const REQUIRED_TOOLS: [&str; 5] = ["sudo", "curl", "openssl", "socat", "conntrack"];
pub const OPTIONAL_TOOLS: [&str; 5] = ["ebtables", "ipset", "chronyd", "showmount", "docker"];

/// Per-host tool availability
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeCheck {
    pub present: Vec<String>,
    pub missing: Vec<String>,
}

impl NodeCheck {
    /// Parse `tool=y` / `tool=n` lines
    pub fn parse(stdout: &str) -> Self {
        let mut check = NodeCheck::default();
        for line in stdout.lines() {
            match line.trim().split_once('=') {
                Some((tool, "y")) => check.present.push(tool.to_string()),
                Some((tool, _)) => check.missing.push(tool.to_string()),
                None => {}
            }
        }
        check
    }

    pub fn missing_required(&self) -> Vec<&str> {
        REQUIRED_TOOLS
            .iter()
            .copied()
            .filter(|tool| self.missing.iter().any(|m| m == *tool))
            .collect()
    }
}

fn probe_script() -> String {
    let tools: Vec<&str> = REQUIRED_TOOLS.iter().chain(OPTIONAL_TOOLS.iter()).copied().collect();
    format!(
        "for b in {}; do if command -v $b >/dev/null 2>&1; then echo \"$b=y\"; else echo \"$b=n\"; fi; done",
        tools.join(" ")
    )
}

pub struct NodePreCheckModule {
    base: BaseModule,
    cluster: Option<Arc<ClusterSpec>>,
}

impl NodePreCheckModule {
    pub fn new() -> Self {
        Self {
            base: BaseModule::new("node-precheck", "Check node dependencies"),
            cluster: None,
        }
    }
}

impl Default for NodePreCheckModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for NodePreCheckModule {
    fn base(&self) -> &BaseModule {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseModule {
        &mut self.base
    }

    fn bind(&mut self, _runtime: &Runtime, slice: SpecSlice) -> Result<(), EngineError> {
        self.cluster = Some(slice.into_cluster(self.base.name())?);
        self.base.bind_span();
        Ok(())
    }

    fn build_tasks(&self, _ctx: &ExecutionContext) -> Result<Vec<Box<dyn Task>>, EngineError> {
        let container_manager = self
            .cluster
            .as_ref()
            .map(|c| c.spec.kubernetes.container_manager.clone())
            .unwrap_or_default();

        let probe = StepTask::new("node-precheck", "Probe required binaries on every node")
            .with_step(
                RemoteCommandStep::new("probe-binaries", probe_script(), HostSelector::All)
                    .record_as(NODE_PRECHECK_KEY),
            )
            .with_step(PreCheckReportStep { container_manager });

        Ok(vec![Box::new(probe)])
    }
}

/// Turns the raw probe output into a report; fails on missing required tools
struct PreCheckReportStep {
    container_manager: String,
}

#[async_trait]
impl Step for PreCheckReportStep {
    fn name(&self) -> &str {
        "report"
    }

    async fn execute(&mut self, ctx: &ExecutionContext) -> Result<StepOutcome, EngineError> {
        let raw: BTreeMap<String, CommandOutput> = ctx
            .module_cache
            .get_as(NODE_PRECHECK_KEY)
            .await
            .ok_or_else(|| EngineError::Cache {
                key: NODE_PRECHECK_KEY.to_string(),
                reason: "probe output missing".to_string(),
            })?;

        let report: BTreeMap<String, NodeCheck> = raw
            .iter()
            .map(|(host, output)| (host.clone(), NodeCheck::parse(&output.stdout)))
            .collect();

        let mut blocked = Vec::new();
        for (host, check) in &report {
            let missing = check.missing_required();
            if !missing.is_empty() {
                blocked.push(format!("{host} lacks {}", missing.join(",")));
            }
            if check.missing.iter().any(|m| *m == self.container_manager) {
                warn!(
                    "{} has no {} yet; it will be installed",
                    host, self.container_manager
                );
            }
        }

        ctx.pipeline_cache
            .set_as(NODE_PRECHECK_REPORT_KEY, &report)
            .await
            .map_err(|e| EngineError::Cache {
                key: NODE_PRECHECK_REPORT_KEY.to_string(),
                reason: e.to_string(),
            })?;

        if blocked.is_empty() {
            info!("All {} nodes passed the dependency check", report.len());
            Ok(StepOutcome::ok(format!("{} nodes ok", report.len())))
        } else {
            Ok(StepOutcome::failed(blocked.join("; ")))
        }
    }
}
