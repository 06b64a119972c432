#![allow(dead_code)]

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rustle_cluster::config::parse_cluster_spec;
use rustle_cluster::runtime::{
    CommandOutput, ConnectionError, Connector, Dialer, Host, Runtime, RuntimeArgs,
};
use rustle_cluster::types::ClusterSpec;

pub const CLUSTER_YAML: &str = r#"
apiVersion: kubekey.kubesphere.io/v1alpha2
kind: Cluster
metadata:
  name: sample
spec:
  hosts:
  - {name: node1, address: 172.16.0.2, internalAddress: 10.0.0.2, user: ubuntu, password: "Qcloud@123"}
  - {name: node2, address: 172.16.0.3, internalAddress: 10.0.0.3, user: ubuntu, password: "Qcloud@123"}
  - {name: node3, address: 172.16.0.4, privateKeyPath: "~/.ssh/id_rsa"}
  roleGroups:
    etcd:
    - node1
    control-plane:
    - node1
    worker:
    - node1
    - node2
    - node3
  controlPlaneEndpoint:
    internalLoadbalancer: haproxy
    domain: lb.kubesphere.local
    address: ""
    port: 6443
  kubernetes:
    version: v1.23.10
    clusterName: cluster.local
"#;

pub fn test_cluster() -> ClusterSpec {
    parse_cluster_spec(CLUSTER_YAML).unwrap()
}

pub type ExecHandler = Arc<dyn Fn(&Host, &str) -> CommandOutput + Send + Sync>;

pub fn ok_output(stdout: &str) -> CommandOutput {
    CommandOutput {
        success: true,
        exit_code: 0,
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

pub fn failed_output(stderr: &str) -> CommandOutput {
    CommandOutput {
        success: false,
        exit_code: 1,
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

#[derive(Default)]
struct Recorder {
    dials: AtomicUsize,
    closes: AtomicUsize,
    commands: Mutex<Vec<(String, String)>>,
    uploads: Mutex<HashMap<(String, String), Vec<u8>>>,
}

/// In-memory dialer recording every dial, command, upload and close
#[derive(Clone)]
pub struct MockDialer {
    recorder: Arc<Recorder>,
    handler: ExecHandler,
    dial_delay: Duration,
    fail_close: bool,
}

impl MockDialer {
    pub fn new() -> Self {
        Self {
            recorder: Arc::new(Recorder::default()),
            handler: Arc::new(|_, _| ok_output("")),
            dial_delay: Duration::ZERO,
            fail_close: false,
        }
    }

    pub fn with_handler(
        mut self,
        handler: impl Fn(&Host, &str) -> CommandOutput + Send + Sync + 'static,
    ) -> Self {
        self.handler = Arc::new(handler);
        self
    }

    pub fn with_dial_delay(mut self, delay: Duration) -> Self {
        self.dial_delay = delay;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn dials(&self) -> usize {
        self.recorder.dials.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.recorder.closes.load(Ordering::SeqCst)
    }

    pub fn commands(&self) -> Vec<(String, String)> {
        self.recorder.commands.lock().unwrap().clone()
    }

    pub fn commands_for(&self, host: &str) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|(h, _)| h == host)
            .map(|(_, c)| c)
            .collect()
    }

    pub fn uploaded(&self, host: &str, path: &str) -> Option<Vec<u8>> {
        self.recorder
            .uploads
            .lock()
            .unwrap()
            .get(&(host.to_string(), path.to_string()))
            .cloned()
    }
}

#[async_trait]
impl Dialer for MockDialer {
    async fn dial(&self, host: &Host) -> Result<Arc<dyn Connector>, ConnectionError> {
        if !self.dial_delay.is_zero() {
            tokio::time::sleep(self.dial_delay).await;
        }
        self.recorder.dials.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockConnector {
            host: host.clone(),
            recorder: Arc::clone(&self.recorder),
            handler: Arc::clone(&self.handler),
            fail_close: self.fail_close,
        }))
    }
}

pub struct MockConnector {
    host: Host,
    recorder: Arc<Recorder>,
    handler: ExecHandler,
    fail_close: bool,
}

impl std::fmt::Debug for MockConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConnector")
            .field("host", &self.host.name)
            .finish()
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn host(&self) -> &Host {
        &self.host
    }

    async fn exec(&self, command: &str) -> Result<CommandOutput, ConnectionError> {
        self.recorder
            .commands
            .lock()
            .unwrap()
            .push((self.host.name.clone(), command.to_string()));

        // Answer checksum probes from what was actually uploaded
        if let Some(rest) = command.strip_prefix("sha256sum ") {
            let path = rest.split_whitespace().next().unwrap_or_default();
            let path = shell_words::split(path)
                .ok()
                .and_then(|mut parts| parts.pop())
                .unwrap_or_default();
            let uploads = self.recorder.uploads.lock().unwrap();
            if let Some(data) = uploads.get(&(self.host.name.clone(), path)) {
                return Ok(ok_output(&format!("{:x}\n", Sha256::digest(data))));
            }
        }

        Ok((self.handler)(&self.host, command))
    }

    async fn upload(&self, data: &[u8], remote_path: &str) -> Result<(), ConnectionError> {
        self.recorder
            .uploads
            .lock()
            .unwrap()
            .insert((self.host.name.clone(), remote_path.to_string()), data.to_vec());
        Ok(())
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        self.recorder.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(ConnectionError::CloseFailed {
                host: self.host.name.clone(),
                reason: "socket already gone".to_string(),
            });
        }
        Ok(())
    }
}

pub fn test_args(work_dir: &Path, ignore_err: bool) -> RuntimeArgs {
    RuntimeArgs {
        work_dir: work_dir.to_path_buf(),
        ignore_err,
        ..RuntimeArgs::default()
    }
}

pub fn test_runtime(dialer: &MockDialer, work_dir: &Path, ignore_err: bool) -> Arc<Runtime> {
    Arc::new(
        Runtime::new(
            test_args(work_dir, ignore_err),
            Some(test_cluster()),
            Arc::new(dialer.clone()),
        )
        .unwrap(),
    )
}
