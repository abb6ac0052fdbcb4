// 命令下发
// Turns item changes into register write sequences on the unit.

use crate::config::WriteBindings;
use crate::connection::{ConnectionManager, Session};
use crate::devices::Parameter;
use crate::drivers::{ModbusError, Transport};
use crate::error::BridgeError;
use crate::types::{ItemChange, UnitMode};
use log::{debug, info};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Commands understood by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `true` switches to manual mode at full fan speed,
    /// `false` goes back to the week program
    ActivatePowerBoost,
}

impl Command {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "activatePowerBoost" => Some(Command::ActivatePowerBoost),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::ActivatePowerBoost => "activatePowerBoost",
        }
    }
}

/// State read back from the unit after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOutcome {
    pub unit_mode: UnitMode,
    pub fan_speed: u16,
}

/// Maximum manual fan speed level
const FAN_SPEED_MAX: u16 = 4;

/// Reacts to changes of send-bound items.
///
/// Errors are returned to the caller as they happen; nothing is retried.
pub struct CommandDispatcher<T: Transport> {
    connection: Arc<ConnectionManager<T>>,
    bindings: WriteBindings,
    unit_id: u8,
    write_delay: Duration,
    caller: String,
}

impl<T: Transport> CommandDispatcher<T> {
    pub fn new(
        connection: Arc<ConnectionManager<T>>,
        bindings: WriteBindings,
        unit_id: u8,
        write_delay: Duration,
        caller: &str,
    ) -> Self {
        Self {
            connection,
            bindings,
            unit_id,
            write_delay,
            caller: caller.to_string(),
        }
    }

    pub fn bindings(&self) -> &WriteBindings {
        &self.bindings
    }

    /// Handle a change notification from the host.
    ///
    /// Changes made by the bridge itself, unbound items, unknown commands and
    /// non-boolean values are ignored and yield `Ok(None)`.
    pub fn on_item_change(
        &self,
        change: &ItemChange,
    ) -> Result<Option<CommandOutcome>, BridgeError> {
        if change.caller == self.caller {
            return Ok(None);
        }
        let Some(name) = self.bindings.command_for(&change.item) else {
            return Ok(None);
        };
        info!(
            "Pluggit: {} set {} to {} for {}",
            change.caller, name, change.value, change.item
        );
        let Some(command) = Command::from_name(name) else {
            debug!("Pluggit: ignoring unknown command {}", name);
            return Ok(None);
        };
        match (command, change.value.as_bool()) {
            (Command::ActivatePowerBoost, Some(true)) => self.activate_power_boost().map(Some),
            (Command::ActivatePowerBoost, Some(false)) => self.activate_week_program().map(Some),
            (Command::ActivatePowerBoost, None) => Ok(None),
        }
    }

    /// Manual mode, then maximum fan speed
    pub fn activate_power_boost(&self) -> Result<CommandOutcome, BridgeError> {
        let mut session = self.connection.lock()?;
        session.connect()?;

        self.write(&mut session, Parameter::UnitMode, UnitMode::MANUAL)?;
        // Mode and speed writes need a pause in between
        thread::sleep(self.write_delay);
        self.write(&mut session, Parameter::FanSpeedLevel, FAN_SPEED_MAX)?;

        let unit_mode = self.read_unit_mode(&mut session)?;
        let fan_speed = self.read_fan_speed(&mut session)?;
        Ok(CommandOutcome {
            unit_mode,
            fan_speed,
        })
    }

    /// Back to the week program; the fan speed follows the program
    pub fn activate_week_program(&self) -> Result<CommandOutcome, BridgeError> {
        let mut session = self.connection.lock()?;
        session.connect()?;

        self.write(&mut session, Parameter::UnitMode, UnitMode::WEEK_PROGRAM)?;
        let unit_mode = self.read_unit_mode(&mut session)?;
        thread::sleep(self.write_delay);
        let fan_speed = self.read_fan_speed(&mut session)?;
        Ok(CommandOutcome {
            unit_mode,
            fan_speed,
        })
    }

    /// The unit expects a two-word field; the value goes in the first word
    fn write(
        &self,
        session: &mut Session<T>,
        parameter: Parameter,
        value: u16,
    ) -> Result<(), BridgeError> {
        debug!("Pluggit: writing {} = {}", parameter, value);
        session
            .write_multiple_registers(self.unit_id, parameter.address(), &[value, 0])
            .map_err(|e| self.failed(e))
    }

    fn read_word(
        &self,
        session: &mut Session<T>,
        parameter: Parameter,
    ) -> Result<u16, BridgeError> {
        let words = session
            .read_holding_registers(self.unit_id, parameter.address(), 1)
            .map_err(|e| self.failed(e))?;
        words.first().copied().ok_or_else(|| {
            self.failed(ModbusError::InvalidData(format!("empty response for {}", parameter)))
        })
    }

    fn read_unit_mode(&self, session: &mut Session<T>) -> Result<UnitMode, BridgeError> {
        let mode = UnitMode::from_raw(self.read_word(session, Parameter::UnitMode)?);
        match mode {
            UnitMode::WeekProgram => debug!("Pluggit: Active Unit Mode: Week program"),
            UnitMode::Manual => debug!("Pluggit: Active Unit Mode: Manual"),
            UnitMode::Other(raw) => debug!("Pluggit: Active Unit Mode: {:#06x}", raw),
        }
        Ok(mode)
    }

    fn read_fan_speed(&self, session: &mut Session<T>) -> Result<u16, BridgeError> {
        let speed = self.read_word(session, Parameter::FanSpeedLevel)?;
        debug!("Pluggit: Fan Speed: {}", speed);
        Ok(speed)
    }

    fn failed(&self, source: ModbusError) -> BridgeError {
        BridgeError::Command {
            command: Command::ActivatePowerBoost.name().to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_names() {
        assert_eq!(
            Command::from_name("activatePowerBoost"),
            Some(Command::ActivatePowerBoost)
        );
        assert_eq!(Command::from_name("activateTurbo"), None);
        assert_eq!(Command::ActivatePowerBoost.name(), "activatePowerBoost");
    }
}
