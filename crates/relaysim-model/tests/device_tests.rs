use std::time::Instant;

use proptest::prelude::*;
use relaysim_ir::Scalar;
use relaysim_model::device::{CommandError, DeviceSimulator, STATUS_ACTIVE, STATUS_FAULT};
use relaysim_model::log::LogLevel;
use relaysim_model::{DeviceState, RegisterError, RegisterType, RegisterValue, TimingConfig};

fn device() -> DeviceSimulator {
    DeviceSimulator::with_timing(TimingConfig::instant())
}

fn status_word(device: &DeviceSimulator) -> i64 {
    match device.get_register("status_word").unwrap() {
        RegisterValue::Int(w) => w,
        other => panic!("status_word holds {other:?}"),
    }
}

#[test]
fn test_fresh_device_defaults() {
    let device = DeviceSimulator::new();
    assert_eq!(device.state(), DeviceState::Idle);
    assert_eq!(device.get_register("voltage").unwrap(), RegisterValue::Float(0.0));
    assert_eq!(device.get_register("frequency").unwrap(), RegisterValue::Float(60.0));
    assert_eq!(device.get_register("trip_flag").unwrap(), RegisterValue::Bool(false));
    assert_eq!(device.get_register("trip_count").unwrap(), RegisterValue::Int(0));
    assert_eq!(device.get_register("temperature").unwrap(), RegisterValue::Float(25.0));
    assert!(device.get_status().log_count >= 1);
    assert_eq!(device.fault_type(), None);
}

#[test]
fn test_activate_sets_status_bit_and_rejects_second_activation() {
    let mut device = device();
    device.activate().unwrap();
    assert_eq!(device.state(), DeviceState::Active);
    assert_eq!(status_word(&device) & STATUS_ACTIVE, STATUS_ACTIVE);

    let err = device.activate().unwrap_err();
    assert_eq!(
        err,
        CommandError::NotIdle {
            state: DeviceState::Active
        }
    );
    assert!(err.to_string().contains("Must be in IDLE state"));
    assert_eq!(device.state(), DeviceState::Active);
}

#[test]
fn test_overcurrent_fault_on_active_device() {
    let mut device = device();
    device.activate().unwrap();
    device.inject_fault("overcurrent").unwrap();

    assert_eq!(device.state(), DeviceState::Fault);
    assert_eq!(device.get_register("trip_flag").unwrap(), RegisterValue::Bool(true));
    assert_eq!(device.get_register("trip_count").unwrap(), RegisterValue::Int(1));
    assert_eq!(device.get_register("current").unwrap(), RegisterValue::Float(999.9));
    assert_eq!(status_word(&device) & STATUS_FAULT, STATUS_FAULT);
    assert_eq!(device.fault_type(), Some("overcurrent"));
    assert!(device.fault_active());
}

#[test]
fn test_reset_after_fault_clears_trip() {
    let mut device = device();
    device.activate().unwrap();
    device.inject_fault("overcurrent").unwrap();
    device.reset().unwrap();

    assert_eq!(device.state(), DeviceState::Idle);
    assert_eq!(device.get_register("trip_flag").unwrap(), RegisterValue::Bool(false));
    assert_eq!(status_word(&device) & STATUS_ACTIVE, 0);
    assert_eq!(device.fault_type(), None);
    assert!(!device.fault_active());
    // trip history survives the reset
    assert_eq!(device.get_register("trip_count").unwrap(), RegisterValue::Int(1));
    assert_eq!(status_word(&device) & STATUS_FAULT, STATUS_FAULT);
}

#[test]
fn test_fault_type_specific_effects() {
    let mut device = device();
    device.inject_fault("overvoltage").unwrap();
    assert_eq!(device.get_register("voltage").unwrap(), RegisterValue::Float(500.0));
    assert_eq!(device.get_register("current").unwrap(), RegisterValue::Float(0.0));

    let mut device = self::device();
    device.inject_fault("temperature").unwrap();
    assert_eq!(device.get_register("temperature").unwrap(), RegisterValue::Float(95.0));
}

#[test]
fn test_unknown_fault_type_is_recorded_without_register_effects() {
    let mut device = device();
    let before = device.registers();
    device.inject_fault("ground_fault").unwrap();

    assert_eq!(device.state(), DeviceState::Fault);
    assert_eq!(device.fault_type(), Some("ground_fault"));
    let after = device.registers();
    for name in ["voltage", "current", "frequency", "temperature"] {
        assert_eq!(before[name], after[name], "{name} changed");
    }
    assert_eq!(after["trip_flag"], RegisterValue::Bool(true));
}

#[test]
fn test_inject_fault_when_already_faulted_still_counts() {
    let mut device = device();
    device.inject_fault("overcurrent").unwrap();
    device.inject_fault("overvoltage").unwrap();
    assert_eq!(device.state(), DeviceState::Fault);
    assert_eq!(device.get_register("trip_count").unwrap(), RegisterValue::Int(2));
    assert_eq!(device.fault_type(), Some("overvoltage"));
}

#[test]
fn test_reset_from_idle_is_allowed() {
    let mut device = device();
    device.reset().unwrap();
    assert_eq!(device.state(), DeviceState::Idle);
}

#[test]
fn test_write_unknown_register() {
    let mut device = device();
    let err = device.write_register("phase_angle", 12.0).unwrap_err();
    assert_eq!(
        err,
        RegisterError::Unknown {
            name: "phase_angle".to_string()
        }
    );
    assert!(device.get_register("phase_angle").is_err());
}

#[test]
fn test_write_coerces_numeric_string() {
    let mut device = device();
    device.write_register("voltage", "230.0").unwrap();
    assert_eq!(device.get_register("voltage").unwrap(), RegisterValue::Float(230.0));
    device.write_register("voltage", 115).unwrap();
    assert_eq!(device.get_register("voltage").unwrap(), RegisterValue::Float(115.0));
}

#[test]
fn test_write_uncoercible_value_fails_without_change() {
    let mut device = device();
    let err = device.write_register("trip_count", "many").unwrap_err();
    assert_eq!(
        err,
        RegisterError::TypeMismatch {
            name: "trip_count".to_string(),
            expected: RegisterType::Int,
            actual: "str".to_string(),
        }
    );
    assert!(err.to_string().contains("Expected int, got str"));
    assert_eq!(device.get_register("trip_count").unwrap(), RegisterValue::Int(0));
}

#[test]
fn test_write_logs_old_and_new_value_at_debug() {
    let mut device = device();
    device.write_register("voltage", 120.0).unwrap();
    let last = device.logs().pop().unwrap();
    assert_eq!(last.level, LogLevel::Debug);
    assert_eq!(last.message, "Register write: voltage");
    assert_eq!(last.data["old_value"], serde_json::json!(0.0));
    assert_eq!(last.data["new_value"], serde_json::json!(120.0));
}

#[test]
fn test_command_log_levels() {
    let mut device = device();
    let start = device.log_count();
    device.activate().unwrap();
    device.inject_fault("overcurrent").unwrap();
    device.reset().unwrap();

    let levels: Vec<LogLevel> = device.logs()[start..].iter().map(|e| e.level).collect();
    assert_eq!(
        levels,
        vec![
            LogLevel::Info,
            LogLevel::Info,
            LogLevel::Warning,
            LogLevel::Error,
            LogLevel::Info,
            LogLevel::Info,
        ]
    );
    let activated = &device.logs()[start + 1];
    assert_eq!(activated.data["previous_state"], "IDLE");
    assert_eq!(activated.data["new_state"], "ACTIVE");
}

#[test]
fn test_status_snapshot_is_detached() {
    let mut device = device();
    let status = device.get_status();
    device.write_register("voltage", 10.0).unwrap();
    assert_eq!(status.registers["voltage"], RegisterValue::Float(0.0));
    assert_eq!(status.state, DeviceState::Idle);
    assert_eq!(status.fault_type, None);
    assert_eq!(status.registers.len(), 7);

    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["state"], "IDLE");
    assert_eq!(json["registers"]["frequency"], 60.0);
    assert!(json["fault_type"].is_null());
}

#[test]
fn test_clear_logs_leaves_marker() {
    let mut device = device();
    device.activate().unwrap();
    device.clear_logs();
    assert_eq!(device.log_count(), 1);
    assert_eq!(device.logs()[0].message, "Logs cleared");
}

#[test]
fn test_log_entry_formats() {
    let device = device();
    let entry = &device.logs()[0];
    let line = entry.to_string();
    assert!(line.ends_with("INFO: Device simulator initialized"), "{line}");
    let json = entry.to_json();
    assert_eq!(json["level"], "INFO");
    assert_eq!(json["data"]["state"], "IDLE");
    assert!(json["datetime"].is_string());
}

#[test]
fn test_activation_delay_is_paid_before_transition() {
    let mut device = DeviceSimulator::with_timing(TimingConfig {
        activation_delay_ms: 40,
        reset_delay_ms: 20,
        fault_detection_delay_ms: 10,
    });
    let start = Instant::now();
    device.activate().unwrap();
    assert!(start.elapsed().as_millis() >= 40);

    let start = Instant::now();
    device.reset().unwrap();
    assert!(start.elapsed().as_millis() >= 20);
}

#[test]
fn test_rejected_activation_does_not_wait() {
    let mut device = DeviceSimulator::with_timing(TimingConfig {
        activation_delay_ms: 500,
        ..TimingConfig::instant()
    });
    device.inject_fault("overcurrent").unwrap();
    let start = Instant::now();
    assert!(device.activate().is_err());
    assert!(start.elapsed().as_millis() < 500);
}

fn typed_value(ty: RegisterType) -> BoxedStrategy<Scalar> {
    match ty {
        RegisterType::Float => (-1.0e6f64..1.0e6).prop_map(Scalar::Float).boxed(),
        RegisterType::Int => any::<i64>().prop_map(Scalar::Int).boxed(),
        RegisterType::Bool => any::<bool>().prop_map(Scalar::Bool).boxed(),
    }
}

proptest! {
    #[test]
    fn prop_write_read_round_trip(
        (name, value) in prop::sample::select(vec![
            ("voltage", RegisterType::Float),
            ("current", RegisterType::Float),
            ("frequency", RegisterType::Float),
            ("temperature", RegisterType::Float),
            ("trip_flag", RegisterType::Bool),
            ("trip_count", RegisterType::Int),
            ("status_word", RegisterType::Int),
        ]).prop_flat_map(|(name, ty)| (Just(name), typed_value(ty)))
    ) {
        let mut device = device();
        device.write_register(name, value.clone()).unwrap();
        let read: Scalar = device.get_register(name).unwrap().into();
        prop_assert_eq!(read, value);
    }

    #[test]
    fn prop_trip_count_never_decreases(
        commands in prop::collection::vec(0u8..3, 1..20)
    ) {
        let mut device = device();
        let mut last = 0;
        for command in commands {
            let _ = match command {
                0 => device.activate(),
                1 => device.reset(),
                _ => device.inject_fault("overcurrent"),
            };
            let RegisterValue::Int(count) = device.get_register("trip_count").unwrap() else {
                panic!("trip_count must be an int");
            };
            prop_assert!(count >= last);
            last = count;
        }
    }
}
