//! SSH key material and client settings

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User the tunnel logs in as when a data source names none
pub const DEFAULT_SSH_USER: &str = "player";

/// Default private key location, relative to the working directory
pub const DEFAULT_PRIVATE_KEY: &str = "config/ssh/id_rsa";

/// Default public key location, relative to the working directory
pub const DEFAULT_PUBLIC_KEY: &str = "config/ssh/id_rsa.pub";

pub const ENV_PRIVATE_KEY: &str = "GRAPHGATE_SSH_PRIVATE_KEY";
pub const ENV_PUBLIC_KEY: &str = "GRAPHGATE_SSH_PUBLIC_KEY";
pub const ENV_USER: &str = "GRAPHGATE_SSH_USER";
pub const ENV_BINARY: &str = "GRAPHGATE_SSH_BINARY";
pub const ENV_TIMEOUT_SECS: &str = "GRAPHGATE_SSH_TIMEOUT_SECS";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Settings for the SSH client used by tunnels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshConfig {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
    pub default_user: String,
    /// OpenSSH client executable
    pub ssh_binary: PathBuf,
    /// How long to wait for the SSH session to come up
    pub connect_timeout: Duration,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            private_key: PathBuf::from(DEFAULT_PRIVATE_KEY),
            public_key: PathBuf::from(DEFAULT_PUBLIC_KEY),
            default_user: DEFAULT_SSH_USER.to_string(),
            ssh_binary: PathBuf::from("ssh"),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl SshConfig {
    /// Defaults overridden by `GRAPHGATE_SSH_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = set(ENV_PRIVATE_KEY) {
            config.private_key = PathBuf::from(path);
        }
        if let Some(path) = set(ENV_PUBLIC_KEY) {
            config.public_key = PathBuf::from(path);
        }
        if let Some(user) = set(ENV_USER) {
            config.default_user = user;
        }
        if let Some(binary) = set(ENV_BINARY) {
            config.ssh_binary = PathBuf::from(binary);
        }
        if let Some(secs) = set(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                Error::config(format!("{ENV_TIMEOUT_SECS} must be a number of seconds, got '{secs}'"))
            })?;
            config.connect_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_keys(mut self, private_key: impl AsRef<Path>, public_key: impl AsRef<Path>) -> Self {
        self.private_key = private_key.as_ref().to_path_buf();
        self.public_key = public_key.as_ref().to_path_buf();
        self
    }

    /// Fail early when the key pair is not where we expect it
    pub fn check_keys(&self) -> Result<()> {
        for path in [&self.private_key, &self.public_key] {
            if !path.is_file() {
                return Err(Error::tunnel(format!(
                    "SSH key file not found: {}",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}
