// 桥接错误类型
use crate::devices::{DecodeError, Parameter};
use crate::drivers::ModbusError;
use thiserror::Error;

/// Errors raised by the bridge
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// Endpoint unreachable or connect timed out; state stays disconnected
    #[error("could not connect to {endpoint}: {source}")]
    Connection {
        endpoint: String,
        source: ModbusError,
    },
    /// Closing the session failed. Only ever logged
    #[error("disconnect from {endpoint} failed: {source}")]
    Disconnect {
        endpoint: String,
        source: ModbusError,
    },
    /// A read in the refresh loop failed; the rest of the cycle was abandoned
    #[error("refresh cycle aborted at {parameter}: {reason}")]
    Cycle {
        parameter: Parameter,
        reason: String,
    },
    /// A write or verification read of a command failed
    #[error("command '{command}' failed: {source}")]
    Command {
        command: String,
        source: ModbusError,
    },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("scheduler: {0}")]
    Scheduler(String),
    #[error("session lock poisoned")]
    LockPoisoned,
}

impl BridgeError {
    pub(crate) fn cycle_read(parameter: Parameter, source: ModbusError) -> Self {
        BridgeError::Cycle {
            parameter,
            reason: source.to_string(),
        }
    }

    pub(crate) fn cycle_decode(parameter: Parameter, source: DecodeError) -> Self {
        BridgeError::Cycle {
            parameter,
            reason: source.to_string(),
        }
    }
}
