// 周期刷新
// Periodic refresh of every bound parameter.

use crate::config::{ReadBindings, Timing, UnitIds};
use crate::connection::{ConnectionManager, Session};
use crate::devices::{decode, translate, DecodedValue, Parameter, ValueKind};
use crate::drivers::Transport;
use crate::error::BridgeError;
use crate::items::ItemSink;
use crate::types::ItemValue;
use log::{debug, error};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Outcome of a completed cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Items that received a value
    pub published: usize,
    /// Parameters read but left unchanged (unmapped states)
    pub unchanged: usize,
    pub elapsed: Duration,
}

/// Polls the unit and publishes the readings to the bound items.
///
/// Failure policy: the first read that fails abandons the rest of the cycle.
/// Readings taken before the failure are still published; nothing is cached
/// and the next tick starts over with a fresh session.
pub struct RefreshCycle<T: Transport> {
    connection: Arc<ConnectionManager<T>>,
    sink: Arc<dyn ItemSink>,
    bindings: ReadBindings,
    units: UnitIds,
    timing: Timing,
    caller: String,
}

impl<T: Transport> RefreshCycle<T> {
    pub fn new(
        connection: Arc<ConnectionManager<T>>,
        sink: Arc<dyn ItemSink>,
        bindings: ReadBindings,
        units: UnitIds,
        timing: Timing,
        caller: &str,
    ) -> Self {
        Self {
            connection,
            sink,
            bindings,
            units,
            timing,
            caller: caller.to_string(),
        }
    }

    pub fn bindings(&self) -> &ReadBindings {
        &self.bindings
    }

    /// Scheduler entry point. Errors are logged; the next tick retries.
    pub fn run(&self) {
        if let Err(e) = self.refresh() {
            error!("Pluggit: something went wrong in the refresh cycle: {}", e);
        }
    }

    /// Run one full cycle
    pub fn refresh(&self) -> Result<CycleReport, BridgeError> {
        let mut readings = Vec::with_capacity(self.bindings.len());
        let start = Instant::now();
        let outcome = self.read_all(&mut readings);

        // Publish outside the session lock so item triggers can reach the unit
        let mut report = CycleReport {
            published: 0,
            unchanged: 0,
            elapsed: Duration::ZERO,
        };
        for (item, parameter, value) in readings {
            match value {
                Some(value) => {
                    self.sink.update(&item, value, &self.caller);
                    report.published += 1;
                }
                None => {
                    debug!("Pluggit: {} left unchanged", parameter);
                    report.unchanged += 1;
                }
            }
        }
        outcome?;

        report.elapsed = start.elapsed();
        debug!("Pluggit: cycle took {:?}", report.elapsed);
        Ok(report)
    }

    fn read_all(
        &self,
        readings: &mut Vec<(String, Parameter, Option<ItemValue>)>,
    ) -> Result<(), BridgeError> {
        let mut session = self.connection.lock()?;

        // Every cycle starts from a new session
        session.disconnect();
        thread::sleep(self.timing.settle);
        session.connect()?;

        for binding in self.bindings.iter() {
            let value = self.read_parameter(&mut session, binding.parameter)?;
            debug!("Pluggit: {} = {}", binding.parameter, value);
            readings.push((
                binding.item.clone(),
                binding.parameter,
                translate(binding.parameter, value),
            ));
            thread::sleep(self.timing.read_delay);
        }
        Ok(())
    }

    /// Read and decode one parameter on an open session
    pub fn read_parameter(
        &self,
        session: &mut Session<T>,
        parameter: Parameter,
    ) -> Result<DecodedValue, BridgeError> {
        let register = parameter.register();
        let unit = match register.kind {
            ValueKind::UInt16 => self.units.default,
            ValueKind::Float32BigEndianDualRegister => self.units.temperature,
        };
        let words = session
            .read_holding_registers(unit, register.address, register.kind.register_count())
            .map_err(|e| BridgeError::cycle_read(parameter, e))?;
        decode(register.kind, &words).map_err(|e| BridgeError::cycle_decode(parameter, e))
    }
}
