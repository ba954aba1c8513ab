use proptest::prelude::*;
use relaysim_model::state::{conditions, DeviceState, StateMachine, TransitionError, TRANSITIONS};

#[test]
fn test_new_machine_is_idle_without_fault() {
    let machine = StateMachine::default();
    assert_eq!(machine.current_state(), DeviceState::Idle);
    assert!(!machine.fault_active());
}

#[test]
fn test_activate_then_reset() {
    let mut machine = StateMachine::default();
    assert_eq!(machine.activate().unwrap(), DeviceState::Active);
    assert_eq!(machine.reset().unwrap(), DeviceState::Idle);
    assert!(!machine.fault_active());
}

#[test]
fn test_fault_sets_and_reset_clears_fault_flag() {
    let mut machine = StateMachine::default();
    machine.activate().unwrap();
    machine.inject_fault().unwrap();
    assert_eq!(machine.current_state(), DeviceState::Fault);
    assert!(machine.fault_active());

    machine.reset().unwrap();
    assert_eq!(machine.current_state(), DeviceState::Idle);
    assert!(!machine.fault_active());
}

#[test]
fn test_activate_from_fault_is_rejected() {
    let mut machine = StateMachine::default();
    machine.inject_fault().unwrap();
    let err = machine.activate().unwrap_err();
    assert_eq!(
        err,
        TransitionError::InvalidTransition {
            from: DeviceState::Fault,
            to: DeviceState::Active,
            condition: conditions::ACTIVATION_REQUESTED.to_string(),
        }
    );
    assert_eq!(machine.current_state(), DeviceState::Fault);
}

#[test]
fn test_wrong_condition_is_rejected() {
    let mut machine = StateMachine::default();
    let result = machine.transition(DeviceState::Active, conditions::RESET_REQUESTED);
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("Cannot transition from IDLE to ACTIVE"));
    assert_eq!(machine.current_state(), DeviceState::Idle);
}

#[test]
fn test_self_transition_is_noop_regardless_of_condition() {
    let mut machine = StateMachine::default();
    machine.inject_fault().unwrap();
    assert_eq!(
        machine.transition(DeviceState::Fault, "anything").unwrap(),
        DeviceState::Fault
    );
    assert!(machine.fault_active());
    assert_eq!(machine.inject_fault().unwrap(), DeviceState::Fault);
}

#[test]
fn test_reset_from_active_uses_reset_requested() {
    let mut machine = StateMachine::default();
    machine.activate().unwrap();
    assert!(machine.can_transition(DeviceState::Idle, Some(conditions::RESET_REQUESTED)));
    assert!(!machine.can_transition(DeviceState::Idle, Some(conditions::RESET_AFTER_FAULT)));
    assert!(!machine.can_transition(DeviceState::Idle, None));
}

#[test]
fn test_transition_table_has_five_entries() {
    assert_eq!(TRANSITIONS.len(), 5);
    assert_eq!(
        StateMachine::required_condition(DeviceState::Fault, DeviceState::Active),
        None
    );
    assert_eq!(
        StateMachine::required_condition(DeviceState::Active, DeviceState::Fault),
        Some(conditions::FAULT_INJECTED)
    );
}

fn any_state() -> impl Strategy<Value = DeviceState> {
    prop::sample::select(DeviceState::ALL.to_vec())
}

fn any_condition() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(conditions::ACTIVATION_REQUESTED.to_string()),
        Just(conditions::RESET_REQUESTED.to_string()),
        Just(conditions::FAULT_INJECTED.to_string()),
        Just(conditions::RESET_AFTER_FAULT.to_string()),
        "[a-z_]{0,12}",
    ]
}

proptest! {
    // Only the five table triples (or a self-transition) ever change state.
    #[test]
    fn prop_transitions_follow_table(
        requests in prop::collection::vec((any_state(), any_condition()), 1..40)
    ) {
        let mut machine = StateMachine::default();
        for (target, condition) in requests {
            let before = machine.current_state();
            let fault_before = machine.fault_active();
            match machine.transition(target, &condition) {
                Ok(after) => {
                    prop_assert_eq!(after, target);
                    if before != target {
                        prop_assert!(TRANSITIONS
                            .iter()
                            .any(|(f, t, c)| *f == before && *t == target && *c == condition));
                        if condition == conditions::FAULT_INJECTED {
                            prop_assert!(machine.fault_active());
                        } else if condition == conditions::RESET_AFTER_FAULT {
                            prop_assert!(!machine.fault_active());
                        } else {
                            prop_assert_eq!(machine.fault_active(), fault_before);
                        }
                    } else {
                        prop_assert_eq!(machine.fault_active(), fault_before);
                    }
                }
                Err(_) => {
                    prop_assert_eq!(machine.current_state(), before);
                    prop_assert_eq!(machine.fault_active(), fault_before);
                }
            }
        }
    }
}
