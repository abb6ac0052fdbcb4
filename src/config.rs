// 配置文件
// Bridge configuration and the read/send bindings declared on items.

use crate::devices::Parameter;
use crate::error::BridgeError;
use crate::types::ItemValue;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors while loading the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] BridgeError),
}

/// One item declared in the configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemConfig {
    /// Item id in the host
    pub id: String,
    /// Parameter published into this item every cycle
    #[serde(
        rename = "read-binding",
        alias = "pluggit_listen",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub read_binding: Option<String>,
    /// Command fired when this item changes
    #[serde(
        rename = "send-binding",
        alias = "pluggit_send",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub send_binding: Option<String>,
    /// Initial value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ItemValue>,
}

/// Configuration of the bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Host name or IP of the unit
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Refresh period in seconds
    #[serde(default = "default_cycle")]
    pub cycle: u64,
    /// Station id used for plain register access
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,
    /// Station id the unit expects for the float temperature registers
    #[serde(default = "default_temperature_unit_id")]
    pub temperature_unit_id: u8,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Pause between dropping and reopening the session at the start of a cycle
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Pause after every parameter read
    #[serde(default = "default_step_delay_ms")]
    pub read_delay_ms: u64,
    /// Pause between the steps of a command
    #[serde(default = "default_step_delay_ms")]
    pub write_delay_ms: u64,
    /// Identity attached to every value the bridge publishes
    #[serde(default = "default_caller")]
    pub caller: String,
    #[serde(default)]
    pub items: Vec<ItemConfig>,
}

fn default_port() -> u16 {
    502
}

fn default_cycle() -> u64 {
    300
}

fn default_unit_id() -> u8 {
    0
}

fn default_temperature_unit_id() -> u8 {
    22
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_settle_delay_ms() -> u64 {
    1000
}

fn default_step_delay_ms() -> u64 {
    100
}

fn default_caller() -> String {
    "Pluggit".to_string()
}

/// Fixed pauses of the device protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub settle: Duration,
    pub read_delay: Duration,
    pub write_delay: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(default_settle_delay_ms()),
            read_delay: Duration::from_millis(default_step_delay_ms()),
            write_delay: Duration::from_millis(default_step_delay_ms()),
        }
    }
}

/// Station ids used on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitIds {
    pub default: u8,
    pub temperature: u8,
}

impl Default for UnitIds {
    fn default() -> Self {
        Self {
            default: default_unit_id(),
            temperature: default_temperature_unit_id(),
        }
    }
}

/// A parameter bound to an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadBinding {
    pub parameter: Parameter,
    pub item: String,
}

/// A command bound to an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBinding {
    pub command: String,
    pub item: String,
}

/// Read bindings in configuration order, one per parameter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadBindings(Vec<ReadBinding>);

impl ReadBindings {
    /// Bind `parameter` to `item`. Binding a parameter again replaces the item
    /// but keeps the original position.
    pub fn insert(&mut self, parameter: Parameter, item: &str) {
        match self.0.iter_mut().find(|b| b.parameter == parameter) {
            Some(existing) => existing.item = item.to_string(),
            None => self.0.push(ReadBinding {
                parameter,
                item: item.to_string(),
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReadBinding> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Send bindings keyed by item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBindings(Vec<WriteBinding>);

impl WriteBindings {
    pub fn insert(&mut self, command: &str, item: &str) {
        match self.0.iter_mut().find(|b| b.item == item) {
            Some(existing) => existing.command = command.to_string(),
            None => self.0.push(WriteBinding {
                command: command.to_string(),
                item: item.to_string(),
            }),
        }
    }

    /// Command name bound to `item`
    pub fn command_for(&self, item: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|b| b.item == item)
            .map(|b| b.command.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &WriteBinding> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl BridgeConfig {
    /// Minimal configuration for `host` with every default applied
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            port: default_port(),
            cycle: default_cycle(),
            unit_id: default_unit_id(),
            temperature_unit_id: default_temperature_unit_id(),
            timeout_ms: default_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            read_delay_ms: default_step_delay_ms(),
            write_delay_ms: default_step_delay_ms(),
            caller: default_caller(),
            items: Vec::new(),
        }
    }

    /// Load and validate a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.host.trim().is_empty() {
            return Err(BridgeError::Config("host must not be empty".into()));
        }
        if self.cycle == 0 {
            return Err(BridgeError::Config("cycle must be at least 1 second".into()));
        }
        if self.caller.is_empty() {
            return Err(BridgeError::Config("caller must not be empty".into()));
        }
        Ok(())
    }

    pub fn cycle_period(&self) -> Duration {
        Duration::from_secs(self.cycle)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn timing(&self) -> Timing {
        Timing {
            settle: Duration::from_millis(self.settle_delay_ms),
            read_delay: Duration::from_millis(self.read_delay_ms),
            write_delay: Duration::from_millis(self.write_delay_ms),
        }
    }

    pub fn unit_ids(&self) -> UnitIds {
        UnitIds {
            default: self.unit_id,
            temperature: self.temperature_unit_id,
        }
    }

    /// Collect the bindings declared on the configured items.
    ///
    /// Unknown read parameters are logged and skipped. Send bindings are kept
    /// as written; unknown commands are ignored when they fire.
    pub fn bindings(&self) -> (ReadBindings, WriteBindings) {
        let mut reads = ReadBindings::default();
        let mut writes = WriteBindings::default();
        for item in &self.items {
            if let Some(name) = &item.read_binding {
                match Parameter::lookup(name) {
                    Ok(parameter) => reads.insert(parameter, &item.id),
                    Err(e) => warn!("Pluggit: {} configured on item {}", e, item.id),
                }
            }
            if let Some(command) = &item.send_binding {
                writes.insert(command, &item.id);
            }
        }
        (reads, writes)
    }
}
