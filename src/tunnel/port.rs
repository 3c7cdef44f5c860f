//! Ephemeral local port allocation

use crate::error::{Error, Result};
use std::net::{Ipv4Addr, TcpListener};

/// Ask the OS for a free local port.
///
/// The probing socket is closed before returning, so another process may grab
/// the port before the tunnel binds it. Tunnels accept that window.
pub fn allocate_local_port() -> Result<u16> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).map_err(Error::NoFreePort)?;
    let port = listener.local_addr().map_err(Error::NoFreePort)?.port();
    drop(listener);
    Ok(port)
}
