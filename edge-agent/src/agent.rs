//! Command dispatcher
//!
//! Three entry points, one per command family:
//! - `execute`: run a local program
//! - `control`: forward a device-management operation to EdgeX
//! - `service_config`: view the service registry or replace a downstream
//!   service's configuration file
//!
//! Each one parses its command line, performs the action and publishes a
//! single SenML record to `channels/<control>/messages/res`. A failed
//! dispatch publishes nothing; the error goes back to the caller.

use crate::command::{CommandLine, ControlCommand, ServiceCommand};
use crate::config::AgentConfig;
use crate::edgex::EdgexClient;
use crate::error::{AgentError, Result};
use crate::exec::{ProcessRunner, SystemRunner};
use crate::heartbeat::HeartbeatListener;
use crate::persistence::{persist, DownstreamService};
use crate::registry::{ServiceRegistry, ServicesMap};
use crate::senml;
use crate::transport::{ControlPlane, InternalBus};
use base64::Engine;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info};

/// Topic responses are published on for a given control channel.
pub fn response_topic(channel: &str) -> String {
    format!("channels/{}/messages/res", channel)
}

pub struct Agent {
    config: AgentConfig,
    control_plane: Arc<dyn ControlPlane>,
    bus: Arc<dyn InternalBus>,
    edgex: Arc<dyn EdgexClient>,
    runner: Arc<dyn ProcessRunner>,
    registry: ServiceRegistry,
    heartbeat: HeartbeatListener,
}

impl Agent {
    /// Build the agent and start listening for heartbeats. Failing to
    /// subscribe aborts construction.
    pub async fn new(
        config: AgentConfig,
        control_plane: Arc<dyn ControlPlane>,
        bus: Arc<dyn InternalBus>,
        edgex: Arc<dyn EdgexClient>,
        registry: ServiceRegistry,
    ) -> Result<Self> {
        let heartbeat = HeartbeatListener::start(bus.as_ref(), registry.clone()).await?;

        info!(
            "Agent initialized - control channel: '{}'",
            config.channels.control
        );

        Ok(Self {
            config,
            control_plane,
            bus,
            edgex,
            runner: Arc::new(SystemRunner),
            registry,
            heartbeat,
        })
    }

    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Run a program and publish its combined output. Returns the
    /// published payload.
    pub async fn execute(&self, id: &str, cmd: &str) -> Result<String> {
        let command = CommandLine::parse(cmd)?;
        debug!("exec [{}]: {} {:?}", id, command.verb, command.args);

        let output = self.runner.run(&command.verb, &command.args).await?;
        let payload = self
            .respond(id, &command.verb, &String::from_utf8_lossy(&output))
            .await?;

        Ok(String::from_utf8_lossy(&payload).into_owned())
    }

    /// Forward a device-management command to EdgeX.
    pub async fn control(&self, id: &str, cmd: &str) -> Result<()> {
        let command = ControlCommand::parse(cmd)?;
        debug!("control [{}]: {:?}", id, command);

        let response = match &command {
            ControlCommand::PushOperation(args) => self.edgex.push_operation(args).await?,
            ControlCommand::FetchConfig(args) => self.edgex.fetch_config(args).await?,
            ControlCommand::FetchMetrics(args) => self.edgex.fetch_metrics(args).await?,
            ControlCommand::Ping => self.edgex.ping().await?,
            ControlCommand::Unrecognized(verb) => {
                return Err(AgentError::UnknownCommand(verb.clone()))
            }
        };

        self.respond(id, command.verb(), &response).await?;
        Ok(())
    }

    /// View registered services or save a downstream service configuration.
    ///
    /// `save` takes the service name, the destination path and the file
    /// content in base64: `save,export,/configs/export/config.toml,<base64>`.
    pub async fn service_config(&self, id: &str, cmd: &str) -> Result<()> {
        let command = ServiceCommand::parse(cmd)?;
        debug!("config [{}]: {}", id, command.verb());

        let response = match &command {
            ServiceCommand::View => serde_json::to_string(&self.services())?,
            ServiceCommand::Save {
                service,
                file,
                content,
            } => {
                let service = self.save_service_config(service, file, content).await?;
                self.notify_config_ready(service).await?;
                String::new()
            }
            ServiceCommand::Unrecognized(verb) => {
                return Err(AgentError::UnknownCommand(verb.clone()))
            }
        };

        self.respond(id, command.verb(), &response).await?;
        Ok(())
    }

    /// Decode and persist a downstream configuration file.
    pub async fn save_service_config(
        &self,
        service: &str,
        file: &str,
        content: &str,
    ) -> Result<DownstreamService> {
        let decoded = base64::engine::general_purpose::STANDARD.decode(content)?;
        let service: DownstreamService = service.parse()?;

        let mut config = service.config_file();
        persist(config.as_mut(), &decoded, file).await?;

        info!("Saved {} configuration to {}", service.name(), file);
        Ok(service)
    }

    /// Fire-and-forget signal that a fresh config file is in place.
    pub async fn notify_config_ready(&self, service: DownstreamService) -> Result<()> {
        self.bus
            .publish(&service.config_ready_subject(), Bytes::new())
            .await
    }

    /// Persist a caller-supplied configuration verbatim. The running agent
    /// keeps its in-memory copy.
    pub async fn add_config(&self, config: &AgentConfig) -> Result<()> {
        config.save().await
    }

    pub fn config(&self) -> AgentConfig {
        self.config.clone()
    }

    pub fn services(&self) -> ServicesMap {
        self.registry.snapshot()
    }

    pub fn heartbeat(&self) -> &HeartbeatListener {
        &self.heartbeat
    }

    /// Publish `payload` as a response on `channel`.
    pub async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<()> {
        self.control_plane
            .publish(&response_topic(channel), payload)
            .await
    }

    async fn respond(&self, id: &str, name: &str, value: &str) -> Result<Vec<u8>> {
        let payload = senml::encode(id, name, value)?;
        self.publish(&self.config.channels.control, payload.clone())
            .await?;
        Ok(payload)
    }
}
