//! Listener settings.

use anyhow::{Context, Result};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Where the HTTP server listens.
///
/// Read from `TODO_HOST` (default `0.0.0.0`) and `TODO_PORT` (default
/// `8000`). Both are parsed up front so a typo fails at startup rather than
/// at bind time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind: SocketAddr,
}

impl ServerConfig {
    /// Loads the listener address from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `TODO_HOST` is not an IP address or `TODO_PORT`
    /// is not a port number.
    pub fn from_env() -> Result<Self> {
        Self::parse(
            std::env::var("TODO_HOST").ok().as_deref(),
            std::env::var("TODO_PORT").ok().as_deref(),
        )
    }

    fn parse(host: Option<&str>, port: Option<&str>) -> Result<Self> {
        let mut bind = Self::default().bind;
        if let Some(host) = host.map(str::trim).filter(|h| !h.is_empty()) {
            let ip: IpAddr = host
                .parse()
                .with_context(|| format!("TODO_HOST must be an IP address, got {host:?}"))?;
            bind.set_ip(ip);
        }
        if let Some(port) = port.map(str::trim).filter(|p| !p.is_empty()) {
            let port: u16 = port
                .parse()
                .with_context(|| format!("TODO_PORT must be a port number, got {port:?}"))?;
            bind.set_port(port);
        }
        Ok(Self { bind })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8000),
        }
    }
}
