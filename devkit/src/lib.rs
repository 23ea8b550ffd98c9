/*!
# Edge Agent DevKit - in-memory collaborators for tests

Library for exercising the agent without a broker:
- MQTT control plane and NATS bus doubles that record every message
- Scripted EdgeX client and process runner that record every call
- Test harness wiring them into a ready-to-use `Agent`
*/

pub mod fakes;
pub mod mock_transport;
pub mod test_utils;

pub use fakes::{EdgexCall, MockEdgexClient, RecordingRunner};
pub use mock_transport::{MockBus, MockControlPlane, MockMessage};
pub use test_utils::TestHarness;
