// Scripted in-memory unit shared by the integration tests
#![allow(dead_code)]

use pluggit_bridge::config::ItemConfig;
use pluggit_bridge::devices::decoder::f32_to_be_words;
use pluggit_bridge::drivers::{ModbusError, Transport};
use pluggit_bridge::{BridgeConfig, ItemSink, ItemValue};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

pub const UNIT: u8 = 0;
pub const TEMP_UNIT: u8 = 22;

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Connect,
    Close,
    Read { unit: u8, address: u16, count: u16 },
    Write { unit: u8, address: u16, values: Vec<u16> },
}

#[derive(Default)]
pub struct UnitState {
    pub registers: HashMap<(u8, u16), u16>,
    pub log: Vec<(Op, Instant)>,
    pub refuse_connect: bool,
    pub fail_read_at: Option<u16>,
    pub fail_write_at: Option<u16>,
}

/// Handle to the simulated unit; clones share state
#[derive(Clone, Default)]
pub struct MockUnit(pub Arc<Mutex<UnitState>>);

impl MockUnit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transport(&self) -> MockTransport {
        MockTransport(self.clone())
    }

    pub fn set(&self, unit: u8, address: u16, value: u16) {
        self.0.lock().unwrap().registers.insert((unit, address), value);
    }

    pub fn set_float(&self, address: u16, value: f32) {
        let [high, low] = f32_to_be_words(value);
        self.set(TEMP_UNIT, address, high);
        self.set(TEMP_UNIT, address + 1, low);
    }

    pub fn get(&self, unit: u8, address: u16) -> u16 {
        *self.0.lock().unwrap().registers.get(&(unit, address)).unwrap_or(&0)
    }

    pub fn refuse_connect(&self, refuse: bool) {
        self.0.lock().unwrap().refuse_connect = refuse;
    }

    pub fn fail_read_at(&self, address: Option<u16>) {
        self.0.lock().unwrap().fail_read_at = address;
    }

    pub fn fail_write_at(&self, address: Option<u16>) {
        self.0.lock().unwrap().fail_write_at = address;
    }

    pub fn ops(&self) -> Vec<Op> {
        self.0.lock().unwrap().log.iter().map(|(op, _)| op.clone()).collect()
    }

    pub fn timed_ops(&self) -> Vec<(Op, Instant)> {
        self.0.lock().unwrap().log.clone()
    }

    pub fn clear_log(&self) {
        self.0.lock().unwrap().log.clear();
    }

    fn record(&self, op: Op) {
        self.0.lock().unwrap().log.push((op, Instant::now()));
    }
}

pub struct MockTransport(MockUnit);

impl Transport for MockTransport {
    fn connect(&mut self) -> Result<(), ModbusError> {
        self.0.record(Op::Connect);
        if self.0 .0.lock().unwrap().refuse_connect {
            return Err(ModbusError::ConnectionFailed("connection refused".into()));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), ModbusError> {
        self.0.record(Op::Close);
        Ok(())
    }

    fn read_holding_registers(
        &mut self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ModbusError> {
        self.0.record(Op::Read {
            unit,
            address,
            count,
        });
        if self.0 .0.lock().unwrap().fail_read_at == Some(address) {
            return Err(ModbusError::Timeout);
        }
        Ok((0..count).map(|i| self.0.get(unit, address + i)).collect())
    }

    fn write_multiple_registers(
        &mut self,
        unit: u8,
        address: u16,
        values: &[u16],
    ) -> Result<(), ModbusError> {
        self.0.record(Op::Write {
            unit,
            address,
            values: values.to_vec(),
        });
        if self.0 .0.lock().unwrap().fail_write_at == Some(address) {
            return Err(ModbusError::Exception("IllegalDataValue".into()));
        }
        for (i, value) in values.iter().enumerate() {
            self.0.set(unit, address + i as u16, *value);
        }
        Ok(())
    }

    fn endpoint(&self) -> String {
        "mock:502".into()
    }
}

/// Sink remembering every update in order
#[derive(Default)]
pub struct RecordingSink {
    pub updates: Mutex<Vec<(String, ItemValue, String)>>,
}

impl RecordingSink {
    pub fn updates(&self) -> Vec<(String, ItemValue, String)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn items(&self) -> Vec<String> {
        self.updates().into_iter().map(|(item, _, _)| item).collect()
    }

    pub fn value_of(&self, item: &str) -> Option<ItemValue> {
        self.updates()
            .into_iter()
            .rev()
            .find(|(i, _, _)| i == item)
            .map(|(_, v, _)| v)
    }
}

impl ItemSink for RecordingSink {
    fn update(&self, item: &str, value: ItemValue, caller: &str) {
        self.updates
            .lock()
            .unwrap()
            .push((item.to_string(), value, caller.to_string()));
    }
}

pub fn read_item(id: &str, parameter: &str) -> ItemConfig {
    ItemConfig {
        id: id.to_string(),
        read_binding: Some(parameter.to_string()),
        send_binding: None,
        value: None,
    }
}

pub fn send_item(id: &str, command: &str) -> ItemConfig {
    ItemConfig {
        id: id.to_string(),
        read_binding: None,
        send_binding: Some(command.to_string()),
        value: None,
    }
}

/// Configuration without settle or read pauses
pub fn fast_config(items: Vec<ItemConfig>) -> BridgeConfig {
    let mut config = BridgeConfig::new("mock");
    config.settle_delay_ms = 0;
    config.read_delay_ms = 0;
    config.write_delay_ms = 20;
    config.items = items;
    config
}

/// Unit with plausible values in every register the bridge reads
pub fn populated_unit() -> MockUnit {
    let unit = MockUnit::new();
    unit.set_float(133, 4.25);
    unit.set_float(135, 19.5);
    unit.set_float(137, 22.125);
    unit.set_float(139, 7.75);
    unit.set(UNIT, 168, 8);
    unit.set(UNIT, 198, 255);
    unit.set(UNIT, 324, 2);
    unit.set(UNIT, 466, 0);
    unit.set(UNIT, 554, 87);
    unit
}
