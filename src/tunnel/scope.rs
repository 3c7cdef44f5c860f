//! Scoped tunnel around a single backend call

use super::config::SshConfig;
use super::openssh::OpenSshConnector;
use super::port::allocate_local_port;
use super::session::{SessionGuard, SshConnector, SshTarget};
use crate::error::Result;
use crate::model::DataSourceInfo;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, Instrument, Span};

/// Opens an SSH tunnel for the duration of one call.
///
/// Each call gets its own session and local port. The session is closed when
/// the call returns, fails, panics or is cancelled.
#[derive(Clone)]
pub struct Tunnel {
    connector: Arc<dyn SshConnector>,
    default_user: String,
    span: Span,
}

impl std::fmt::Debug for Tunnel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tunnel")
            .field("default_user", &self.default_user)
            .finish_non_exhaustive()
    }
}

impl Tunnel {
    pub fn new(connector: Arc<dyn SshConnector>, default_user: impl Into<String>) -> Self {
        Self {
            connector,
            default_user: default_user.into(),
            span: Span::none(),
        }
    }

    /// Tunnel backed by the OpenSSH client
    pub fn openssh(config: SshConfig) -> Self {
        let default_user = config.default_user.clone();
        Self::new(Arc::new(OpenSshConnector::new(config)), default_user)
    }

    /// Log tunnel activity under `span`
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn target_for(&self, data_source: &DataSourceInfo) -> SshTarget {
        let user = if data_source.ssh_user.trim().is_empty() {
            self.default_user.clone()
        } else {
            data_source.ssh_user.clone()
        };
        SshTarget {
            gateway: data_source.gateway.clone(),
            port: data_source.ssh_port,
            user,
        }
    }

    /// Run `call` against a local copy of `data_source`.
    ///
    /// For a remote data source this opens a session to its gateway, forwards
    /// a fresh local port to `server:port`, and hands `call` a descriptor
    /// pointing at `localhost:<local port>`. Non-remote data sources are
    /// passed straight through.
    pub async fn scoped<T, F, Fut>(&self, data_source: &DataSourceInfo, call: F) -> Result<T>
    where
        F: FnOnce(DataSourceInfo) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !data_source.remote {
            return call(data_source.clone()).await;
        }

        async {
            data_source.validate_remote()?;

            let local_port = allocate_local_port()?;
            let target = self.target_for(data_source);
            let session = self.connector.connect(&target).await?;
            let mut guard = SessionGuard::new(session);

            guard
                .session()
                .forward_local(local_port, &data_source.server, data_source.port)
                .await?;

            info!(
                data_source = %data_source.name,
                gateway = %target.gateway,
                local_port,
                server = %data_source.server,
                port = data_source.port,
                "Tunnel open"
            );

            let result = call(data_source.to_local(local_port)).await;
            guard.release();
            info!(data_source = %data_source.name, local_port, "Tunnel closed");
            result
        }
        .instrument(self.span.clone())
        .await
    }
}
