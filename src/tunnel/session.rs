//! SSH session abstraction

use crate::error::Result;
use async_trait::async_trait;

/// Where to open an SSH session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub gateway: String,
    pub port: u16,
    pub user: String,
}

/// Opens SSH sessions
#[async_trait]
pub trait SshConnector: Send + Sync {
    async fn connect(&self, target: &SshTarget) -> Result<Box<dyn SshSession>>;
}

/// A live SSH session
#[async_trait]
pub trait SshSession: Send {
    /// Forward `127.0.0.1:local_port` to `remote_host:remote_port` as seen from the gateway
    async fn forward_local(
        &mut self,
        local_port: u16,
        remote_host: &str,
        remote_port: u16,
    ) -> Result<()>;

    /// Tear the session down. Must not block on the network.
    fn disconnect(&mut self);
}

/// Disconnects its session exactly once, on release or on drop
pub(crate) struct SessionGuard {
    session: Box<dyn SshSession>,
    released: bool,
}

impl SessionGuard {
    pub(crate) fn new(session: Box<dyn SshSession>) -> Self {
        Self {
            session,
            released: false,
        }
    }

    pub(crate) fn session(&mut self) -> &mut dyn SshSession {
        self.session.as_mut()
    }

    pub(crate) fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.session.disconnect();
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.release();
    }
}
