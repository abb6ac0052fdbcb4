//! Polling bridge between home-automation items and a Pluggit ventilation
//! unit reachable over Modbus TCP.
//!
//! Every cycle the bridge opens a fresh session, reads the holding registers
//! bound to items, translates them (temperatures, unit mode, bypass state, fan
//! speed, week program, filter lifetime) and publishes the results. Changes of
//! send-bound items are turned into register writes.

pub mod bridge;
pub mod config;
pub mod connection;
pub mod devices;
pub mod dispatcher;
pub mod drivers;
pub mod error;
pub mod items;
pub mod poller;
pub mod scheduler;
pub mod types;

pub use bridge::PluggitBridge;
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use items::{ItemSink, ItemStore};
pub use types::{ItemChange, ItemValue};
