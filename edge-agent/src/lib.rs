//! Edge Agent - control-plane bridge for edge gateways
//!
//! The agent receives textual commands over MQTT and:
//! - runs them as local programs (`exec`)
//! - forwards them to the EdgeX system management agent (`control`)
//! - inspects heartbeat-discovered services or rewrites a downstream
//!   service's configuration file (`config`)
//!
//! Results go back to the control plane as one-record SenML packs. Local
//! services are tracked through heartbeats on the NATS internal bus.

pub mod agent;
pub mod command;
pub mod config;
pub mod edgex;
pub mod error;
pub mod exec;
pub mod heartbeat;
pub mod http;
pub mod persistence;
pub mod registry;
pub mod router;
pub mod senml;
pub mod transport;

pub use agent::Agent;
pub use config::AgentConfig;
pub use error::{AgentError, Result};
pub use registry::{Service, ServiceRegistry, ServiceStatus};
