//! Dashboard configuration loaded from environment variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default port the dashboard listens on.
pub const DEFAULT_PORT: u16 = 3333;

/// Default keeper root, relative to the working directory.
pub const DEFAULT_KEEPER_DIR: &str = "keeper";

/// Delay between a failed push channel and the next connection attempt.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Directory holding seed vault YAML files (from KEEPER_SEEDS_DIR)
    pub seeds_dir: PathBuf,
    /// Directory holding decision YAML files (from KEEPER_DECISIONS_DIR)
    pub decisions_dir: PathBuf,
    /// Bind address (from KEEPER_HOST)
    pub host: IpAddr,
    /// Bind port (from KEEPER_PORT)
    pub port: u16,
}

impl DashboardConfig {
    /// Build a config rooted at a keeper directory with `seeds/` and
    /// `decisions/` underneath.
    pub fn with_keeper_dir(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            seeds_dir: root.join("seeds"),
            decisions_dir: root.join("decisions"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let root = lookup("KEEPER_DIR").unwrap_or_else(|| DEFAULT_KEEPER_DIR.to_string());
        let mut config = Self::with_keeper_dir(root);

        if let Some(dir) = lookup("KEEPER_SEEDS_DIR") {
            config.seeds_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("KEEPER_DECISIONS_DIR") {
            config.decisions_dir = PathBuf::from(dir);
        }
        if let Some(host) = lookup("KEEPER_HOST").and_then(|s| s.trim().parse().ok()) {
            config.host = host;
        }
        if let Some(port) = lookup("KEEPER_PORT").and_then(|s| s.trim().parse().ok()) {
            config.port = port;
        }

        config
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
