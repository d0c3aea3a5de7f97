//! The `client` module provides a small client for the broker protocol.

pub mod broker_client;

pub use broker_client::BrokerClient;
