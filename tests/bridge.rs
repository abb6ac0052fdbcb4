mod common;

use common::*;
use pluggit_bridge::{BridgeConfig, BridgeError, ItemValue, PluggitBridge};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn probe_opens_and_closes_once() {
    let unit = populated_unit();
    let bridge = PluggitBridge::new(
        fast_config(vec![]),
        unit.transport(),
        Arc::new(RecordingSink::default()),
    )
    .unwrap();
    assert!(bridge.probe());
    assert_eq!(unit.ops(), vec![Op::Connect, Op::Close]);
    assert!(!bridge.connection().is_connected());
}

#[test]
fn scheduled_refresh_runs_until_stopped() {
    let unit = populated_unit();
    let sink = Arc::new(RecordingSink::default());
    let mut config = fast_config(vec![read_item("pluggit.filter", "FilterRemainingTime")]);
    config.cycle = 1;
    let mut bridge = PluggitBridge::new(config, unit.transport(), sink.clone()).unwrap();

    bridge.start().unwrap();
    assert!(bridge.is_running());
    assert!(matches!(bridge.start(), Err(BridgeError::Scheduler(_))));

    thread::sleep(Duration::from_millis(1500));
    bridge.stop();
    assert!(!bridge.is_running());
    assert!(!bridge.connection().is_connected());

    let seen = sink.updates().len();
    assert!(seen >= 1);
    assert_eq!(sink.value_of("pluggit.filter"), Some(ItemValue::Int(87)));

    thread::sleep(Duration::from_millis(1200));
    assert_eq!(sink.updates().len(), seen);
}

#[test]
fn invalid_configuration_is_rejected() {
    let unit = populated_unit();
    let config = BridgeConfig::new(" ");
    assert!(matches!(
        PluggitBridge::new(config, unit.transport(), Arc::new(RecordingSink::default())),
        Err(BridgeError::Config(_))
    ));
}

#[test]
fn configuration_file_drives_bindings() {
    let unit = populated_unit();
    let sink = Arc::new(RecordingSink::default());
    let config = BridgeConfig::from_json(
        r#"{
            "host": "mock",
            "settle_delay_ms": 0,
            "read_delay_ms": 0,
            "items": [
                { "id": "kwl.aussen", "pluggit_listen": "prmRamIdxT1" },
                { "id": "kwl.modus", "pluggit_listen": "prmRamIdxUnitMode" },
                { "id": "kwl.boost", "pluggit_send": "activatePowerBoost" }
            ]
        }"#,
    )
    .unwrap();
    let bridge = PluggitBridge::new(config, unit.transport(), sink.clone()).unwrap();
    assert_eq!(bridge.run_cycle().unwrap().published, 2);
    assert_eq!(sink.value_of("kwl.aussen"), Some(ItemValue::Float(4.25)));
    assert_eq!(
        sink.value_of("kwl.modus"),
        Some(ItemValue::Text("week-program-active".into()))
    );
}
