//! SSH tunnel transport
//!
//! Remote data sources sit behind an SSH gateway. [`Tunnel::scoped`] opens a
//! session for one call, forwards an ephemeral local port to the backend, and
//! closes the session afterwards no matter how the call ends.
//! [`Tunneled`] applies that to every operation of a capability.

mod config;
mod decorated;
mod openssh;
mod port;
mod scope;
mod session;

pub use config::{
    SshConfig, DEFAULT_PRIVATE_KEY, DEFAULT_PUBLIC_KEY, DEFAULT_SSH_USER, ENV_BINARY,
    ENV_PRIVATE_KEY, ENV_PUBLIC_KEY, ENV_TIMEOUT_SECS, ENV_USER,
};
pub use decorated::Tunneled;
pub use openssh::{OpenSshConnector, OpenSshSession};
pub use port::allocate_local_port;
pub use scope::Tunnel;
pub use session::{SshConnector, SshSession, SshTarget};
