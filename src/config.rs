//! Bot configuration.
//!
//! Read once at startup from a JSON file and passed into the engine by
//! value. Nothing re-reads configuration at runtime; a config change means
//! a restart.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Connection and identity settings from the operator's config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server host name or address.
    pub address: String,
    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Username for the identity declaration.
    pub user: String,
    /// Real name for the identity declaration.
    pub real_name: String,
    /// Candidate nicks, tried in order on collision. Must not be empty.
    pub nicks: Vec<String>,
    /// NickServ password; when set, identify right after registration.
    #[serde(default)]
    pub nickserv_password: Option<String>,
    /// Channels to join once registered.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Farewell sent with QUIT on clean shutdown.
    #[serde(default = "default_quit_message")]
    pub quit_message: String,
    /// Log chat traffic at info level (always available at debug).
    #[serde(default)]
    pub logging: bool,
}

fn default_port() -> u16 {
    6667
}

fn default_quit_message() -> String {
    "bye".to_string()
}

impl Config {
    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.address.is_empty() {
            bail!("config needs a server address");
        }
        if self.nicks.is_empty() {
            bail!("config needs at least one candidate nick");
        }
        Ok(())
    }

    /// `host:port` for the dialer.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Engine timings. Defaults suit a real server; tests shrink them.
///
/// Only the relationships matter: the read timeout bounds dispatch latency
/// for periodic work, and the probe timeout should be short relative to
/// the probe interval.
#[derive(Debug, Clone)]
pub struct Tuning {
    /// Upper bound on one socket wait; also the periodic-tick cadence.
    pub read_timeout: Duration,
    /// Quiet time on the link before we probe the server.
    pub probe_interval: Duration,
    /// How long an unanswered probe is tolerated.
    pub probe_timeout: Duration,
    /// Pause between a fatal session error and the next connect.
    pub reconnect_delay: Duration,
    /// Cooldown before rejoining a channel we were kicked from.
    pub rejoin_delay: Duration,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(500),
            probe_interval: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(5),
            rejoin_delay: Duration::from_secs(2),
        }
    }
}
