// 核心桥接逻辑
// Wires configuration, session, refresh cycle and command dispatch together

use crate::config::BridgeConfig;
use crate::connection::ConnectionManager;
use crate::dispatcher::{CommandDispatcher, CommandOutcome};
use crate::drivers::Transport;
use crate::error::BridgeError;
use crate::items::{ItemSink, ItemStore};
use crate::poller::{CycleReport, RefreshCycle};
use crate::scheduler::{PeriodicTask, Scheduler};
use crate::types::ItemChange;
use log::info;
use std::sync::Arc;

/// Name of the periodic refresh task
pub const TASK_NAME: &str = "Pluggit";

/// Bridge between host items and one ventilation unit
pub struct PluggitBridge<T: Transport + 'static> {
    config: BridgeConfig,
    connection: Arc<ConnectionManager<T>>,
    poller: Arc<RefreshCycle<T>>,
    dispatcher: Arc<CommandDispatcher<T>>,
    task: Option<PeriodicTask>,
}

impl<T: Transport + 'static> PluggitBridge<T> {
    /// Build the bridge from a validated configuration
    ///
    /// # Arguments
    /// * `config` - Bridge configuration with item bindings
    /// * `transport` - Transport to the unit, not yet connected
    /// * `sink` - Host side receiving the readings
    pub fn new(
        config: BridgeConfig,
        transport: T,
        sink: Arc<dyn ItemSink>,
    ) -> Result<Self, BridgeError> {
        config.validate()?;
        let (reads, writes) = config.bindings();
        info!(
            "Pluggit: {} read binding(s), {} send binding(s)",
            reads.len(),
            writes.len()
        );

        let connection = Arc::new(ConnectionManager::new(transport));
        let units = config.unit_ids();
        let timing = config.timing();
        let poller = RefreshCycle::new(
            connection.clone(),
            sink,
            reads,
            units,
            timing,
            &config.caller,
        );
        let dispatcher = CommandDispatcher::new(
            connection.clone(),
            writes,
            units.default,
            timing.write_delay,
            &config.caller,
        );

        Ok(Self {
            config,
            connection,
            poller: Arc::new(poller),
            dispatcher: Arc::new(dispatcher),
            task: None,
        })
    }

    /// Open and close a session once to check the unit is reachable
    pub fn probe(&self) -> bool {
        let reachable = self.connection.connect();
        self.connection.disconnect();
        reachable
    }

    /// Route changes of every send-bound item in `store` to the dispatcher
    pub fn register_triggers(&self, store: &ItemStore) {
        for binding in self.dispatcher.bindings().iter() {
            let dispatcher = self.dispatcher.clone();
            store.add_trigger(
                &binding.item,
                Arc::new(move |change: &ItemChange| -> Result<(), BridgeError> {
                    dispatcher.on_item_change(change).map(|_| ())
                }),
            );
        }
    }

    /// Start the periodic refresh
    pub fn start(&mut self) -> Result<(), BridgeError> {
        if self.task.is_some() {
            return Err(BridgeError::Scheduler("refresh already running".into()));
        }
        let poller = self.poller.clone();
        let task = Scheduler::spawn(TASK_NAME, self.config.cycle_period(), move || poller.run())
            .map_err(|e| BridgeError::Scheduler(e.to_string()))?;
        self.task = Some(task);
        Ok(())
    }

    /// Stop the periodic refresh and close the session
    pub fn stop(&mut self) {
        if let Some(mut task) = self.task.take() {
            task.stop();
        }
        self.connection.disconnect();
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Run one refresh cycle now
    pub fn run_cycle(&self) -> Result<CycleReport, BridgeError> {
        self.poller.refresh()
    }

    /// Handle a change notification of a host item
    pub fn on_item_change(
        &self,
        change: &ItemChange,
    ) -> Result<Option<CommandOutcome>, BridgeError> {
        self.dispatcher.on_item_change(change)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn connection(&self) -> &Arc<ConnectionManager<T>> {
        &self.connection
    }
}

impl<T: Transport + 'static> Drop for PluggitBridge<T> {
    fn drop(&mut self) {
        self.stop();
    }
}
