//! Heartbeat listener
//!
//! Local services publish on `heartbeat.<service-name>`. The listener holds
//! one subscription to `heartbeat.*` and feeds every delivery into the
//! service registry. Malformed subjects are logged and dropped.

use crate::error::Result;
use crate::registry::ServiceRegistry;
use crate::transport::InternalBus;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

pub const HEARTBEAT_SUBJECT: &str = "heartbeat.*";

/// Running heartbeat subscription; torn down when dropped.
#[derive(Debug)]
pub struct HeartbeatListener {
    task: JoinHandle<()>,
}

impl HeartbeatListener {
    /// Subscribe and start consuming. A subscription failure is returned
    /// to the caller; nothing is spawned in that case.
    pub async fn start(bus: &dyn InternalBus, registry: ServiceRegistry) -> Result<Self> {
        let mut messages = bus.subscribe(HEARTBEAT_SUBJECT).await?;
        info!("Listening for service heartbeats on '{}'", HEARTBEAT_SUBJECT);

        let task = tokio::spawn(async move {
            while let Some(msg) = messages.next().await {
                handle_heartbeat(&registry, &msg.subject);
            }
            debug!("Heartbeat subscription closed");
        });

        Ok(Self { task })
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for HeartbeatListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Apply one heartbeat to the registry. Returns the service name when the
/// subject was well formed.
pub fn handle_heartbeat(registry: &ServiceRegistry, subject: &str) -> Option<String> {
    match service_name(subject) {
        Some(name) => {
            registry.register_or_touch(name);
            Some(name.to_string())
        }
        None => {
            error!("Failed: heartbeat subject has incorrect format '{}'", subject);
            None
        }
    }
}

/// Second segment of `heartbeat.<name>`.
fn service_name(subject: &str) -> Option<&str> {
    subject.split('.').nth(1).filter(|name| !name.is_empty())
}
