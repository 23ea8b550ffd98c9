//! Inbound control-plane requests
//!
//! Requests arrive on `channels/<control>/messages/req` as SenML packs. The
//! first record selects the entry point through its name (`exec`,
//! `control`, `config`); `vs` carries the command line and `bn` the request
//! id (a trailing `:` is dropped).
//!
//! Failures are only logged: on the control plane, a missing response is
//! the failure signal.

use crate::agent::Agent;
use crate::error::{AgentError, Result};
use crate::senml;
use crate::transport::MqttControlPlane;
use rumqttc::{Event, EventLoop, Incoming};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub fn request_topic(channel: &str) -> String {
    format!("channels/{}/messages/req", channel)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Exec,
    Control,
    Config,
}

impl FromStr for RequestKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "exec" => Ok(RequestKind::Exec),
            "control" => Ok(RequestKind::Control),
            "config" => Ok(RequestKind::Config),
            other => Err(AgentError::UnknownCommand(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: String,
    pub kind: RequestKind,
    pub command: String,
}

impl Request {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let pack = senml::decode(payload)?;
        let record = pack.records.into_iter().next().ok_or(AgentError::InvalidCommand)?;

        let kind = record.name.parse()?;
        let command = record.string_value.ok_or(AgentError::InvalidCommand)?;
        let id = record
            .base_name
            .strip_suffix(':')
            .unwrap_or(&record.base_name)
            .to_string();

        Ok(Self { id, kind, command })
    }
}

/// Dispatch one request to its entry point.
pub async fn route(agent: &Agent, request: &Request) -> Result<()> {
    match request.kind {
        RequestKind::Exec => agent.execute(&request.id, &request.command).await.map(|_| ()),
        RequestKind::Control => agent.control(&request.id, &request.command).await,
        RequestKind::Config => agent.service_config(&request.id, &request.command).await,
    }
}

/// Decode and route a raw payload on its own task.
pub fn spawn_request(agent: Arc<Agent>, payload: Vec<u8>) {
    tokio::spawn(async move {
        let request = match Request::decode(&payload) {
            Ok(request) => request,
            Err(e) => {
                warn!("Dropping malformed request: {}", e);
                return;
            }
        };

        if let Err(e) = route(&agent, &request).await {
            error!("Request {} ({:?}) failed: {}", request.id, request.kind, e);
        }
    });
}

/// Background task that (re)subscribes to the request topic whenever the
/// broker acknowledges a connection.
///
/// `subscribe` waits for room in the client's request queue, and only the
/// event loop drains that queue, so the wait must not happen on the task
/// that polls it.
#[derive(Debug)]
pub struct Resubscriber {
    connected: Arc<Notify>,
    task: JoinHandle<()>,
}

impl Resubscriber {
    pub fn spawn(control_plane: MqttControlPlane, topic: String) -> Self {
        let connected = Arc::new(Notify::new());
        let signal = connected.clone();

        let task = tokio::spawn(async move {
            loop {
                signal.notified().await;
                info!("Connected to MQTT broker, subscribing to {}", topic);
                if let Err(e) = control_plane.subscribe(&topic).await {
                    error!("{}", e);
                }
            }
        });

        Self { connected, task }
    }

    /// Record a new connection. Never waits.
    pub fn connected(&self) {
        self.connected.notify_one();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Resubscriber {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Drive the MQTT event loop, handing requests to `spawn_request` and
/// resubscribing on every connection.
pub async fn run_event_loop(
    mut eventloop: EventLoop,
    control_plane: MqttControlPlane,
    agent: Arc<Agent>,
) {
    let topic = request_topic(&agent.config().channels.control);
    let resubscriber = Resubscriber::spawn(control_plane, topic.clone());

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Incoming::ConnAck(_))) => resubscriber.connected(),
            Ok(Event::Incoming(Incoming::Publish(publish))) if publish.topic == topic => {
                debug!("Received request on topic: {}", publish.topic);
                spawn_request(agent.clone(), publish.payload.to_vec());
            }
            Ok(_) => {}
            Err(e) => {
                error!("MQTT connection error: {}", e);
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }
}
