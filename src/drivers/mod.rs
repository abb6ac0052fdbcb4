// Communication drivers module
//
// Drivers for the interfaces the bridge talks to. The ventilation unit is only
// reachable over Modbus TCP.

/// Modbus TCP communication driver
/// Blocking client for holding-register access on the ventilation unit
pub mod modbus;

pub use modbus::{ModbusClient, ModbusError, Transport};
