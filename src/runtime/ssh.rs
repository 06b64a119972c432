//! OpenSSH backed connectors
//!
//! Each dial starts a ControlMaster session for the host; commands and
//! uploads are multiplexed over its control socket until `close`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::runtime::connector::{CommandOutput, Connector, Dialer};
use crate::runtime::error::ConnectionError;
use crate::runtime::host::{Credentials, Host};

pub struct SshDialer {
    ssh: PathBuf,
    scp: PathBuf,
    sshpass: Option<PathBuf>,
    control_dir: PathBuf,
    connect_timeout: Duration,
}

impl SshDialer {
    pub fn new(control_dir: PathBuf, connect_timeout: Duration) -> Result<Self, ConnectionError> {
        let ssh = which::which("ssh").map_err(|_| ConnectionError::MissingBinary {
            binary: "ssh".to_string(),
        })?;
        let scp = which::which("scp").map_err(|_| ConnectionError::MissingBinary {
            binary: "scp".to_string(),
        })?;

        Ok(Self {
            ssh,
            scp,
            sshpass: which::which("sshpass").ok(),
            control_dir,
            connect_timeout,
        })
    }

    fn master_command(&self, host: &Host, socket: &Path) -> Result<Command, ConnectionError> {
        let mut cmd = match &host.credentials {
            Credentials::Password(password) => {
                let sshpass = self
                    .sshpass
                    .as_ref()
                    .ok_or_else(|| ConnectionError::MissingBinary {
                        binary: "sshpass".to_string(),
                    })?;
                let mut cmd = Command::new(sshpass);
                cmd.env("SSHPASS", password).arg("-e").arg(&self.ssh);
                cmd
            }
            _ => Command::new(&self.ssh),
        };

        cmd.arg("-M")
            .arg("-f")
            .arg("-N")
            .arg("-S")
            .arg(socket)
            .arg("-o")
            .arg("ControlPersist=yes")
            .arg("-o")
            .arg("StrictHostKeyChecking=no")
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.connect_timeout.as_secs()))
            .arg("-p")
            .arg(host.port.to_string());

        match &host.credentials {
            Credentials::PrivateKey(key) => {
                cmd.arg("-i").arg(key).arg("-o").arg("BatchMode=yes");
            }
            Credentials::Agent => {
                cmd.arg("-o").arg("BatchMode=yes");
            }
            Credentials::Password(_) => {}
        }

        cmd.arg(host.destination());
        Ok(cmd)
    }
}

/// Unix socket paths are capped near 108 bytes, so keep the name short
fn control_socket(control_dir: &Path, host: &Host) -> PathBuf {
    control_dir.join(format!("{}.sock", host.id.short()))
}

#[async_trait]
impl Dialer for SshDialer {
    async fn dial(&self, host: &Host) -> Result<Arc<dyn Connector>, ConnectionError> {
        tokio::fs::create_dir_all(&self.control_dir)
            .await
            .map_err(|e| ConnectionError::ConnectFailed {
                host: host.name.clone(),
                reason: format!("Failed to create control directory: {e}"),
            })?;

        let socket = control_socket(&self.control_dir, host);
        debug!("Opening ssh master to {} via {}", host.name, socket.display());

        let output = self
            .master_command(host, &socket)?
            .output()
            .await
            .map_err(|e| ConnectionError::ConnectFailed {
                host: host.name.clone(),
                reason: format!("Failed to execute ssh: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("Permission denied") {
                return Err(ConnectionError::AuthenticationFailed {
                    host: host.name.clone(),
                });
            }
            return Err(ConnectionError::ConnectFailed {
                host: host.name.clone(),
                reason: stderr.trim().to_string(),
            });
        }

        Ok(Arc::new(SshConnector {
            host: host.clone(),
            ssh: self.ssh.clone(),
            scp: self.scp.clone(),
            socket,
        }))
    }
}

#[derive(Debug)]
pub struct SshConnector {
    host: Host,
    ssh: PathBuf,
    scp: PathBuf,
    socket: PathBuf,
}

impl SshConnector {
    fn control_command(&self) -> Command {
        let mut cmd = Command::new(&self.ssh);
        cmd.arg("-S")
            .arg(&self.socket)
            .arg("-p")
            .arg(self.host.port.to_string());
        cmd
    }
}

#[async_trait]
impl Connector for SshConnector {
    fn host(&self) -> &Host {
        &self.host
    }

    async fn exec(&self, command: &str) -> Result<CommandOutput, ConnectionError> {
        debug!("Executing command on {}: {}", self.host.name, command);

        let output = self
            .control_command()
            .arg(self.host.destination())
            .arg(command)
            .output()
            .await
            .map_err(|e| ConnectionError::CommandFailed {
                host: self.host.name.clone(),
                command: command.to_string(),
                reason: e.to_string(),
            })?;

        Ok(CommandOutput {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    async fn upload(&self, data: &[u8], remote_path: &str) -> Result<(), ConnectionError> {
        let upload_error = |reason: String| ConnectionError::UploadFailed {
            host: self.host.name.clone(),
            path: remote_path.to_string(),
            reason,
        };

        let temp_file = tempfile::NamedTempFile::new()
            .map_err(|e| upload_error(format!("Failed to create temp file: {e}")))?;
        tokio::fs::write(temp_file.path(), data)
            .await
            .map_err(|e| upload_error(format!("Failed to write temp file: {e}")))?;

        let output = Command::new(&self.scp)
            .arg("-o")
            .arg(format!("ControlPath={}", self.socket.display()))
            .arg("-P")
            .arg(self.host.port.to_string())
            .arg(temp_file.path())
            .arg(format!("{}:{}", self.host.destination(), remote_path))
            .output()
            .await
            .map_err(|e| upload_error(format!("Failed to execute scp: {e}")))?;

        if !output.status.success() {
            return Err(upload_error(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(())
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        debug!("Closing ssh master to {}", self.host.name);

        let output = self
            .control_command()
            .arg("-O")
            .arg("exit")
            .arg(self.host.destination())
            .output()
            .await
            .map_err(|e| ConnectionError::CloseFailed {
                host: self.host.name.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ConnectionError::CloseFailed {
                host: self.host.name.clone(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}
