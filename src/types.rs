// 共享类型定义
// Item values, change notifications and the device state enums

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value carried by an observable item.
///
/// Readings from the unit are published as `Int`, `Float` or `Text`;
/// commands arrive as `Bool`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ItemValue {
    /// Parse a value typed by an operator (`true`, `42`, `21.5`, anything else is text)
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw {
            "true" | "on" => return ItemValue::Bool(true),
            "false" | "off" => return ItemValue::Bool(false),
            _ => {}
        }
        if let Ok(v) = raw.parse::<i64>() {
            return ItemValue::Int(v);
        }
        if let Ok(v) = raw.parse::<f64>() {
            return ItemValue::Float(v);
        }
        ItemValue::Text(raw.to_string())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ItemValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ItemValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemValue::Bool(v) => write!(f, "{}", v),
            ItemValue::Int(v) => write!(f, "{}", v),
            ItemValue::Float(v) => write!(f, "{}", v),
            ItemValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Notification fired by the host when an item changes
#[derive(Debug, Clone, PartialEq)]
pub struct ItemChange {
    /// Id of the changed item
    pub item: String,
    /// New value
    pub value: ItemValue,
    /// Identity of whoever set the value
    pub caller: String,
}

impl ItemChange {
    pub fn new(item: impl Into<String>, value: ItemValue, caller: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            value,
            caller: caller.into(),
        }
    }
}

/// Active unit mode (register 40169)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitMode {
    Manual,
    WeekProgram,
    Other(u16),
}

impl UnitMode {
    pub const MANUAL: u16 = 0x0004;
    pub const WEEK_PROGRAM: u16 = 0x0008;

    pub fn from_raw(raw: u16) -> Self {
        match raw {
            Self::MANUAL => UnitMode::Manual,
            Self::WEEK_PROGRAM => UnitMode::WeekProgram,
            other => UnitMode::Other(other),
        }
    }

    pub fn raw(&self) -> u16 {
        match self {
            UnitMode::Manual => Self::MANUAL,
            UnitMode::WeekProgram => Self::WEEK_PROGRAM,
            UnitMode::Other(raw) => *raw,
        }
    }

    /// Label published to the bound item; `None` leaves the item unchanged
    pub fn label(&self) -> Option<&'static str> {
        match self {
            UnitMode::WeekProgram => Some("week-program-active"),
            UnitMode::Manual => Some("manual-mode-active"),
            UnitMode::Other(_) => None,
        }
    }
}

/// Bypass actual state (register 40199)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassState {
    Closed,
    InProcess,
    Closing,
    Opening,
    Opened,
    Unknown(u16),
}

impl BypassState {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0x0000 => BypassState::Closed,
            0x0001 => BypassState::InProcess,
            0x0020 => BypassState::Closing,
            0x0040 => BypassState::Opening,
            0x00FF => BypassState::Opened,
            other => BypassState::Unknown(other),
        }
    }

    /// Only the two end positions are published
    pub fn label(&self) -> Option<&'static str> {
        match self {
            BypassState::Opened => Some("open"),
            BypassState::Closed => Some("closed"),
            _ => None,
        }
    }
}
