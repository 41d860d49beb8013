//! loraprs-test-harness: Mock collaborators for the LoRa APRS gateway.
//!
//! Every external collaborator the gateway talks to has a deterministic
//! stand-in here. The mocks share their state behind an `Arc`, so a test can
//! keep a clone, hand the other clone to the code under test as a
//! `Box<dyn ...>`, and inspect what happened afterwards.
//!
//! - [`MockTransport`] -- scripted byte stream (KISS terminal or relay session)
//! - [`MockConnector`] -- hands out [`MockTransport`] relay sessions
//! - [`MockRadio`] -- queued inbound packets, transmit and retune log
//! - [`MockUplink`] -- wireless uplink that can fail a number of reconnects
//! - [`MockTcpServer`] -- loopback server recording relay lines per connection

pub mod mock_connector;
pub mod mock_radio;
pub mod mock_serial;
pub mod mock_tcp;
pub mod mock_uplink;

pub use mock_connector::MockConnector;
pub use mock_radio::MockRadio;
pub use mock_serial::MockTransport;
pub use mock_tcp::MockTcpServer;
pub use mock_uplink::MockUplink;
