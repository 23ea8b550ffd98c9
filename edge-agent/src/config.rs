//! Agent configuration
//!
//! Handles:
//! - control-plane channels and MQTT broker settings
//! - NATS URL for the internal bus
//! - EdgeX system-management endpoint
//! - heartbeat interval, log level and local HTTP port
//!
//! Stored as TOML. The agent reads it once at startup; `save` only runs for
//! an explicit add-config request.

use crate::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "EDGE_AGENT_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "./config.toml";
/// Longest accepted heartbeat interval, in seconds (one day).
pub const MAX_HEARTBEAT_INTERVAL: u64 = 86_400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AgentConfig {
    pub server: ServerConfig,
    pub channels: ChannelsConfig,
    pub edgex: EdgexConfig,
    pub heartbeat: HeartbeatConfig,
    pub log: LogConfig,
    pub mqtt: MqttConfig,
    pub nats: NatsConfig,
    /// Where `save` writes; not part of the file itself.
    #[serde(skip)]
    pub file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ChannelsConfig {
    pub control: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgexConfig {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Seconds between expected heartbeats.
    pub interval: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u64,
    pub qos: u8,
    pub retain: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    pub url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 9000 }
    }
}

impl Default for EdgexConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:48090/api/v1/".to_string(),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self { interval: 10 }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "edge-agent".to_string(),
            username: None,
            password: None,
            keep_alive_secs: 30,
            qos: 0,
            retain: false,
        }
    }
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
        }
    }
}

impl AgentConfig {
    /// Load from `path`. A missing file yields the defaults, still bound to
    /// `path` so a later `save` lands there.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| AgentError::Config(format!("{}: {}", path.display(), e)))?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };

        config.file = path.to_path_buf();
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| AgentError::Config(e.to_string()))
    }

    /// Write to `self.file`, creating parent directories as needed.
    pub async fn save(&self) -> Result<()> {
        if self.file.as_os_str().is_empty() {
            return Err(AgentError::Persistence("no file path set".to_string()));
        }

        if let Some(parent) = self.file.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AgentError::Persistence(e.to_string()))?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| AgentError::Persistence(e.to_string()))?;
        tokio::fs::write(&self.file, content)
            .await
            .map_err(|e| AgentError::Persistence(e.to_string()))
    }

    /// Config path from the environment, or the default.
    pub fn path_from_env() -> PathBuf {
        std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs())
    }

    /// A service is considered offline after three missed heartbeats.
    pub fn liveness_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.heartbeat_secs() as i64 * 3)
    }

    /// Configured interval clamped to `1..=MAX_HEARTBEAT_INTERVAL`.
    fn heartbeat_secs(&self) -> u64 {
        self.heartbeat.interval.clamp(1, MAX_HEARTBEAT_INTERVAL)
    }
}
