// 宿主数据点接口
// The contract with the host item framework and a small in-process host.

use crate::error::BridgeError;
use crate::types::{ItemChange, ItemValue};
use log::{debug, error, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Where readings are published.
///
/// `caller` is the identity of the component pushing the value; the host hands
/// it back in change notifications so the bridge can recognise its own updates.
pub trait ItemSink: Send + Sync {
    fn update(&self, item: &str, value: ItemValue, caller: &str);
}

/// Callback fired when an item changes value
pub type Trigger = Arc<dyn Fn(&ItemChange) -> Result<(), BridgeError> + Send + Sync>;

/// In-memory item host.
///
/// Keeps the latest value of every item and fires the triggers registered on an
/// item whenever its value changes. Trigger failures are logged here.
#[derive(Default)]
pub struct ItemStore {
    values: Mutex<HashMap<String, ItemValue>>,
    triggers: Mutex<HashMap<String, Vec<Trigger>>>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `trigger` to be called on every change of `item`
    pub fn add_trigger(&self, item: &str, trigger: Trigger) {
        match self.triggers.lock() {
            Ok(mut triggers) => triggers.entry(item.to_string()).or_default().push(trigger),
            Err(_) => error!("item store: trigger table poisoned"),
        }
    }

    /// Seed a value without firing triggers
    pub fn set_initial(&self, item: &str, value: ItemValue) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(item.to_string(), value);
        }
    }

    pub fn get(&self, item: &str) -> Option<ItemValue> {
        self.values.lock().ok()?.get(item).cloned()
    }

    /// Copy of all current values, sorted by item id
    pub fn snapshot(&self) -> Vec<(String, ItemValue)> {
        let mut all: Vec<_> = match self.values.lock() {
            Ok(values) => values.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            Err(_) => Vec::new(),
        };
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    fn fire(&self, change: &ItemChange) {
        let triggers = match self.triggers.lock() {
            Ok(triggers) => triggers.get(&change.item).cloned().unwrap_or_default(),
            Err(_) => return,
        };
        for trigger in triggers {
            if let Err(e) = trigger(change) {
                error!("item {}: trigger failed: {}", change.item, e);
            }
        }
    }
}

impl ItemSink for ItemStore {
    fn update(&self, item: &str, value: ItemValue, caller: &str) {
        let changed = match self.values.lock() {
            Ok(mut values) => {
                let previous = values.insert(item.to_string(), value.clone());
                previous.as_ref() != Some(&value)
            }
            Err(_) => {
                warn!("item store poisoned, dropping update of {}", item);
                return;
            }
        };
        debug!("Item {} = {} via {}", item, value, caller);
        if changed {
            self.fire(&ItemChange::new(item, value, caller));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn stores_latest_value() {
        let store = ItemStore::new();
        store.update("pluggit.fan", ItemValue::Int(2), "Pluggit");
        store.update("pluggit.fan", ItemValue::Int(3), "Pluggit");
        assert_eq!(store.get("pluggit.fan"), Some(ItemValue::Int(3)));
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn triggers_fire_on_change_only() {
        let store = ItemStore::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();
        store.add_trigger(
            "pluggit.boost",
            Arc::new(move |change: &ItemChange| -> Result<(), BridgeError> {
                assert_eq!(change.caller, "cli");
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );
        store.update("pluggit.boost", ItemValue::Bool(true), "cli");
        store.update("pluggit.boost", ItemValue::Bool(true), "cli");
        store.update("pluggit.boost", ItemValue::Bool(false), "cli");
        store.update("other", ItemValue::Bool(true), "cli");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn trigger_errors_do_not_escape() {
        let store = ItemStore::new();
        store.add_trigger(
            "pluggit.boost",
            Arc::new(|_: &ItemChange| -> Result<(), BridgeError> {
                Err(BridgeError::Config("boom".into()))
            }),
        );
        store.update("pluggit.boost", ItemValue::Bool(true), "cli");
        assert_eq!(store.get("pluggit.boost"), Some(ItemValue::Bool(true)));
    }

    #[test]
    fn initial_values_do_not_fire() {
        let store = ItemStore::new();
        store.add_trigger(
            "a",
            Arc::new(|_: &ItemChange| -> Result<(), BridgeError> { panic!("should not fire") }),
        );
        store.set_initial("a", ItemValue::Bool(false));
        assert_eq!(store.snapshot(), vec![("a".to_string(), ItemValue::Bool(false))]);
    }
}
