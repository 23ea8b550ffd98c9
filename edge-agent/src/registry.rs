//! Service registry - liveness bookkeeping for local services
//!
//! Services announce themselves on the internal bus with periodic
//! heartbeats. The registry keeps one entry per service name:
//! - created on the first heartbeat for an unseen name
//! - refreshed (`online`, new `last_seen`) on every following heartbeat
//! - flipped to `offline` by the liveness monitor when heartbeats stop
//!
//! Entries are never removed. Heartbeat delivery and `view` queries run on
//! independent tasks, so the map lives behind a mutex.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Service type reported for heartbeat-discovered services.
pub const HEARTBEAT_SERVICE_TYPE: &str = "heartbeat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub last_seen: DateTime<Utc>,
    pub status: ServiceStatus,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Service {
    fn new(name: &str, now: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            last_seen: now,
            status: ServiceStatus::Online,
            kind: HEARTBEAT_SERVICE_TYPE.to_string(),
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.last_seen = now;
        self.status = ServiceStatus::Online;
    }
}

pub type ServicesMap = HashMap<String, Service>;

/// Cheaply clonable handle; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: Arc<Mutex<ServicesMap>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a liveness signal for `name`. Returns true when the service
    /// was seen for the first time.
    pub fn register_or_touch(&self, name: &str) -> bool {
        self.register_or_touch_at(name, Utc::now())
    }

    pub fn register_or_touch_at(&self, name: &str, now: DateTime<Utc>) -> bool {
        let mut services = self.services.lock();
        match services.get_mut(name) {
            Some(service) => {
                service.touch(now);
                debug!("Heartbeat from service '{}'", name);
                false
            }
            None => {
                services.insert(name.to_string(), Service::new(name, now));
                info!("Service '{}' registered", name);
                true
            }
        }
    }

    /// Copy of the current name -> service map, taken under the lock.
    pub fn snapshot(&self) -> ServicesMap {
        self.services.lock().clone()
    }

    pub fn get(&self, name: &str) -> Option<Service> {
        self.services.lock().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.services.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.lock().is_empty()
    }

    /// Mark services silent for longer than `timeout` as offline.
    /// Returns the names that changed state.
    pub fn mark_stale(&self, timeout: Duration) -> Vec<String> {
        self.mark_stale_at(Utc::now(), timeout)
    }

    pub fn mark_stale_at(&self, now: DateTime<Utc>, timeout: Duration) -> Vec<String> {
        let threshold = now - timeout;
        let mut services = self.services.lock();
        let mut changed = Vec::new();

        for (name, service) in services.iter_mut() {
            if service.status == ServiceStatus::Online && service.last_seen < threshold {
                service.status = ServiceStatus::Offline;
                changed.push(name.clone());
            }
        }

        for name in &changed {
            info!("Service '{}' marked offline", name);
        }
        changed
    }
}

/// Periodically mark silent services offline.
pub fn spawn_liveness_monitor(
    registry: ServiceRegistry,
    interval: std::time::Duration,
    timeout: Duration,
) -> tokio::task::JoinHandle<()> {
    info!(
        "Starting service liveness monitor (interval: {:?}, timeout: {}s)",
        interval,
        timeout.num_seconds()
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            registry.mark_stale(timeout);
        }
    })
}
