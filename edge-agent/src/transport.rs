//! Publish/subscribe capabilities used by the agent
//!
//! The agent talks to two transports:
//! - the control plane (MQTT), where responses are published
//! - the internal bus (NATS), used for heartbeats and config-ready signals
//!
//! Both are consumed through small traits so the dispatcher can run against
//! in-memory doubles. Connection setup, TLS and reconnection stay inside the
//! client libraries.

use crate::config::MqttConfig;
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use std::time::Duration;
use tracing::info;

/// Control-plane publish capability.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()>;
}

/// A message delivered by the internal bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub subject: String,
    pub payload: Bytes,
}

pub type BusStream = BoxStream<'static, BusMessage>;

/// Internal-bus publish/subscribe capability.
///
/// Messages of one subscription are yielded in order, one at a time.
#[async_trait]
pub trait InternalBus: Send + Sync {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<()>;

    async fn subscribe(&self, pattern: &str) -> Result<BusStream>;
}

/// MQTT control plane backed by rumqttc.
#[derive(Clone)]
pub struct MqttControlPlane {
    client: AsyncClient,
    qos: QoS,
    retain: bool,
}

impl MqttControlPlane {
    /// Build the client and its event loop. The caller owns the event loop
    /// and must keep polling it for anything to reach the broker.
    pub fn connect(config: &MqttConfig) -> (Self, EventLoop) {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        options.set_clean_session(true);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, eventloop) = AsyncClient::new(options, 10);
        info!("MQTT client configured for {}:{}", config.host, config.port);

        (
            Self {
                client,
                qos: qos_from_level(config.qos),
                retain: config.retain,
            },
            eventloop,
        )
    }

    pub async fn subscribe(&self, topic: &str) -> Result<()> {
        self.client
            .subscribe(topic, self.qos)
            .await
            .map_err(|e| AgentError::Subscribe(format!("{}: {}", topic, e)))
    }
}

#[async_trait]
impl ControlPlane for MqttControlPlane {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        self.client
            .publish(topic, self.qos, self.retain, payload)
            .await
            .map_err(|e| AgentError::Publish(e.to_string()))
    }
}

fn qos_from_level(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}

/// NATS internal bus backed by async-nats.
#[derive(Clone)]
pub struct NatsBus {
    client: async_nats::Client,
}

impl NatsBus {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| AgentError::Connection(format!("NATS at {}: {}", url, e)))?;
        info!("Connected to NATS at {}", url);
        Ok(Self { client })
    }
}

#[async_trait]
impl InternalBus for NatsBus {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<()> {
        self.client
            .publish(subject.to_string(), payload)
            .await
            .map_err(|e| AgentError::Publish(e.to_string()))
    }

    async fn subscribe(&self, pattern: &str) -> Result<BusStream> {
        let subscriber = self
            .client
            .subscribe(pattern.to_string())
            .await
            .map_err(|e| AgentError::Subscribe(format!("{}: {}", pattern, e)))?;

        Ok(subscriber
            .map(|msg| BusMessage {
                subject: msg.subject.to_string(),
                payload: msg.payload,
            })
            .boxed())
    }
}
