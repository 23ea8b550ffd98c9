//! Downstream service configuration files
//!
//! The control plane can replace the configuration file of a known local
//! service. The agent does not interpret the content beyond what the
//! service's own configuration type needs to parse it; a parse failure is
//! reported as is.

use crate::error::{AgentError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

pub const COMMANDS_SUBJECT: &str = "commands";
pub const CONFIG_SUBJECT: &str = "config";

/// A downstream service's own configuration object.
#[async_trait]
pub trait ConfigFile: Send + Sync {
    /// Populate from raw file content.
    fn read_bytes(&mut self, content: &[u8]) -> Result<()>;

    fn set_file(&mut self, file: PathBuf);

    async fn save(&self) -> Result<()>;
}

/// Parse `content` into `target` and write it to `file`.
pub async fn persist(target: &mut dyn ConfigFile, content: &[u8], file: &str) -> Result<()> {
    target.read_bytes(content)?;
    target.set_file(PathBuf::from(file));
    target.save().await
}

/// Services whose configuration the agent is allowed to overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownstreamService {
    Export,
}

impl DownstreamService {
    pub fn name(&self) -> &'static str {
        match self {
            DownstreamService::Export => "export",
        }
    }

    /// Fresh configuration object for this service.
    pub fn config_file(&self) -> Box<dyn ConfigFile> {
        match self {
            DownstreamService::Export => Box::new(ExportConfig::default()),
        }
    }

    /// Subject announcing that a new configuration file is in place.
    pub fn config_ready_subject(&self) -> String {
        format!("{}.{}.{}", COMMANDS_SUBJECT, self.name(), CONFIG_SUBJECT)
    }
}

impl FromStr for DownstreamService {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "export" => Ok(DownstreamService::Export),
            other => Err(AgentError::NoSuchService(other.to_string())),
        }
    }
}

/// Configuration of the export service (MQTT <-> NATS forwarder).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExportConfig {
    pub exp: ExportServer,
    pub mqtt: ExportMqtt,
    pub routes: Vec<ExportRoute>,
    #[serde(skip)]
    pub file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExportServer {
    pub nats: String,
    pub log_level: String,
    pub port: String,
    pub cache_url: String,
    pub cache_pass: String,
    pub cache_db: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExportMqtt {
    pub host: String,
    pub username: String,
    pub password: String,
    pub channel: String,
    pub mtls: bool,
    pub skip_tls_ver: bool,
    pub retain: bool,
    pub qos: u8,
    pub ca_path: String,
    pub cert_path: String,
    pub priv_key_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExportRoute {
    pub mqtt_topic: String,
    pub nats_topic: String,
    pub subtopic: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub workers: u32,
}

#[async_trait]
impl ConfigFile for ExportConfig {
    fn read_bytes(&mut self, content: &[u8]) -> Result<()> {
        let text = std::str::from_utf8(content)
            .map_err(|e| AgentError::Persistence(format!("config is not UTF-8: {}", e)))?;
        let parsed: ExportConfig =
            toml::from_str(text).map_err(|e| AgentError::Persistence(e.to_string()))?;

        self.exp = parsed.exp;
        self.mqtt = parsed.mqtt;
        self.routes = parsed.routes;
        Ok(())
    }

    fn set_file(&mut self, file: PathBuf) {
        self.file = file;
    }

    async fn save(&self) -> Result<()> {
        if let Some(parent) = self.file.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AgentError::Persistence(e.to_string()))?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| AgentError::Persistence(e.to_string()))?;
        tokio::fs::write(&self.file, content)
            .await
            .map_err(|e| AgentError::Persistence(format!("{}: {}", self.file.display(), e)))
    }
}
