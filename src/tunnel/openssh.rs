//! SSH sessions backed by the OpenSSH client
//!
//! A session is an `ssh -M -N` control master. Port forwards are added to the
//! running master with `ssh -O forward`, and the master is killed on
//! disconnect.

use super::config::SshConfig;
use super::session::{SshConnector, SshSession, SshTarget};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, warn};

const READY_POLL: Duration = Duration::from_millis(100);

/// Opens sessions by spawning the OpenSSH client
#[derive(Debug, Clone)]
pub struct OpenSshConnector {
    config: SshConfig,
}

impl OpenSshConnector {
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    fn control_path(&self, target: &SshTarget) -> PathBuf {
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        std::env::temp_dir().join(format!(
            "graphgate-{}-{}-{}.sock",
            std::process::id(),
            target.port,
            nanos
        ))
    }

    fn master_command(&self, target: &SshTarget, control_path: &Path) -> Command {
        let mut cmd = Command::new(&self.config.ssh_binary);
        cmd.arg("-M")
            .arg("-S")
            .arg(control_path)
            .arg("-N")
            .args(["-o", "StrictHostKeyChecking=no"])
            .args(["-o", "UserKnownHostsFile=/dev/null"])
            .args(["-o", "BatchMode=yes"])
            .args(["-o", "IdentitiesOnly=yes"])
            .args(["-o", "ExitOnForwardFailure=yes"])
            .args(["-o", "ServerAliveInterval=30"])
            .arg("-i")
            .arg(&self.config.private_key)
            .arg("-p")
            .arg(target.port.to_string())
            .arg("-l")
            .arg(&target.user)
            .arg(&target.gateway)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Poll the control socket until the master accepts commands
    async fn wait_ready(&self, child: &mut Child, target: &SshTarget, control_path: &Path) -> Result<()> {
        let deadline = Instant::now() + self.config.connect_timeout;

        loop {
            if let Some(status) = child
                .try_wait()
                .map_err(|e| Error::tunnel_io("Failed to poll ssh process", e))?
            {
                let stderr = read_stderr(child).await;
                return Err(Error::tunnel(format!(
                    "ssh to {}@{}:{} exited with {status}: {stderr}",
                    target.user, target.gateway, target.port
                )));
            }

            let ready = Command::new(&self.config.ssh_binary)
                .arg("-S")
                .arg(control_path)
                .args(["-O", "check"])
                .arg(&target.gateway)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await
                .map(|status| status.success())
                .unwrap_or(false);
            if ready {
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(Error::tunnel(format!(
                    "Timed out after {:?} connecting to {}:{}",
                    self.config.connect_timeout, target.gateway, target.port
                )));
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }
}

#[async_trait]
impl SshConnector for OpenSshConnector {
    async fn connect(&self, target: &SshTarget) -> Result<Box<dyn SshSession>> {
        self.config.check_keys()?;

        let control_path = self.control_path(target);
        let mut child = self
            .master_command(target, &control_path)
            .spawn()
            .map_err(|e| {
                Error::tunnel_io(
                    format!("Failed to start {}", self.config.ssh_binary.display()),
                    e,
                )
            })?;

        if let Err(e) = self.wait_ready(&mut child, target, &control_path).await {
            let _ = child.start_kill();
            let _ = std::fs::remove_file(&control_path);
            return Err(e);
        }

        debug!(gateway = %target.gateway, port = target.port, user = %target.user, "SSH session established");

        Ok(Box::new(OpenSshSession {
            child,
            control_path,
            target: target.clone(),
            ssh_binary: self.config.ssh_binary.clone(),
            closed: false,
        }))
    }
}

/// A running OpenSSH control master
#[derive(Debug)]
pub struct OpenSshSession {
    child: Child,
    control_path: PathBuf,
    target: SshTarget,
    ssh_binary: PathBuf,
    closed: bool,
}

#[async_trait]
impl SshSession for OpenSshSession {
    async fn forward_local(
        &mut self,
        local_port: u16,
        remote_host: &str,
        remote_port: u16,
    ) -> Result<()> {
        let forward = format!("127.0.0.1:{local_port}:{remote_host}:{remote_port}");
        let output = Command::new(&self.ssh_binary)
            .arg("-S")
            .arg(&self.control_path)
            .args(["-O", "forward"])
            .arg("-L")
            .arg(&forward)
            .arg(&self.target.gateway)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::tunnel_io("Failed to run ssh -O forward", e))?;

        if !output.status.success() {
            return Err(Error::tunnel(format!(
                "Port forward {forward} via {} failed: {}",
                self.target.gateway,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        debug!(local_port, remote_host, remote_port, "Port forward added");
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.child.start_kill() {
            warn!(gateway = %self.target.gateway, error = %e, "Failed to stop ssh process");
        }
        let _ = std::fs::remove_file(&self.control_path);
        debug!(gateway = %self.target.gateway, "SSH session closed");
    }
}

async fn read_stderr(child: &mut Child) -> String {
    let mut buffer = String::new();
    if let Some(mut stderr) = child.stderr.take() {
        let _ = stderr.read_to_string(&mut buffer).await;
    }
    buffer.trim().to_string()
}
