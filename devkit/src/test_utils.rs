/*!
Test harness for the agent

Builds an `Agent` on top of the devkit doubles and exposes them for
assertions:
- control-plane publishes, decoded as SenML
- bus publishes and simulated heartbeat deliveries
- recorded EdgeX and process-runner calls
*/

use crate::fakes::{MockEdgexClient, RecordingRunner};
use crate::mock_transport::{MockBus, MockControlPlane};
use anyhow::Result;
use edge_agent::agent::response_topic;
use edge_agent::exec::SystemRunner;
use edge_agent::senml::Record;
use edge_agent::{Agent, AgentConfig, ServiceRegistry};
use std::sync::Arc;
use std::time::Duration;

pub const CONTROL_CHANNEL: &str = "c0ffee";

pub struct TestHarness {
    pub control: MockControlPlane,
    pub bus: MockBus,
    pub edgex: MockEdgexClient,
    pub runner: RecordingRunner,
    pub registry: ServiceRegistry,
    pub agent: Arc<Agent>,
}

impl TestHarness {
    /// Agent wired to the doubles, with a recording process runner.
    pub async fn new() -> Result<Self> {
        Self::build(false).await
    }

    /// Same, but commands really run on the host.
    pub async fn with_system_runner() -> Result<Self> {
        Self::build(true).await
    }

    async fn build(system_runner: bool) -> Result<Self> {
        env_logger::try_init().ok();

        let mut config = AgentConfig::default();
        config.channels.control = CONTROL_CHANNEL.to_string();

        let control = MockControlPlane::new();
        let bus = MockBus::new();
        let edgex = MockEdgexClient::new();
        let runner = RecordingRunner::new();
        let registry = ServiceRegistry::new();

        let agent = Agent::new(
            config,
            Arc::new(control.clone()),
            Arc::new(bus.clone()),
            Arc::new(edgex.clone()),
            registry.clone(),
        )
        .await?;
        let agent = if system_runner {
            agent.with_runner(Arc::new(SystemRunner))
        } else {
            agent.with_runner(Arc::new(runner.clone()))
        };

        Ok(Self {
            control,
            bus,
            edgex,
            runner,
            registry,
            agent: Arc::new(agent),
        })
    }

    pub fn response_topic(&self) -> String {
        response_topic(CONTROL_CHANNEL)
    }

    /// All records published as responses, in order.
    pub fn responses(&self) -> Vec<Record> {
        self.control
            .find_messages_by_topic(&self.response_topic())
            .iter()
            .filter_map(|msg| edge_agent::senml::decode(&msg.payload).ok())
            .flat_map(|pack| pack.records)
            .collect()
    }

    pub fn last_response(&self) -> Option<Record> {
        self.responses().pop()
    }

    /// Simulate a heartbeat from `service`.
    pub fn send_heartbeat(&self, service: &str) -> usize {
        let subject = format!("heartbeat.{}", service);
        log::info!("💓 Sent heartbeat for service: {}", service);
        self.bus.deliver(&subject, b"")
    }

    /// Poll `condition` until it holds or `timeout_ms` elapses.
    pub async fn wait_until(&self, timeout_ms: u64, condition: impl Fn() -> bool) -> bool {
        let start = std::time::Instant::now();

        while start.elapsed() < Duration::from_millis(timeout_ms) {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        condition()
    }
}
