//! Integration test: execution FSM lifecycle.

use cnc_control::state::{Effect, ExecutionFsm, FsmState, Transition, TransitionResult};

#[test]
fn full_lifecycle_fires_expected_effects() {
    let mut fsm = ExecutionFsm::new();
    let mut effects = Vec::new();

    for next in [
        Some(FsmState::Idle),
        None,
        Some(FsmState::Run),
        Some(FsmState::Idle),
        Some(FsmState::Run),
        Some(FsmState::Idle),
        Some(FsmState::Stop),
    ] {
        if let TransitionResult::Ok(Transition { effect, .. }) = fsm.request(next) {
            effects.push(effect);
        }
    }

    assert_eq!(fsm.state(), FsmState::Stop);
    assert_eq!(
        effects,
        vec![
            Some(Effect::Setup),
            None,
            Some(Effect::Setup),
            None,
            Some(Effect::Setup),
            Some(Effect::Teardown),
        ]
    );
}

#[test]
fn rejected_request_keeps_the_fsm_usable() {
    let mut fsm = ExecutionFsm::new();
    assert!(matches!(
        fsm.request(Some(FsmState::Run)),
        TransitionResult::Rejected(_)
    ));
    assert_eq!(fsm.state(), FsmState::Init);

    assert!(matches!(
        fsm.request(Some(FsmState::Idle)),
        TransitionResult::Ok(_)
    ));
    assert!(matches!(
        fsm.request(Some(FsmState::Init)),
        TransitionResult::Rejected(_)
    ));
    assert_eq!(fsm.state(), FsmState::Idle);
}

#[test]
fn stop_is_final() {
    let mut fsm = ExecutionFsm::new();
    fsm.request(Some(FsmState::Idle));
    fsm.request(Some(FsmState::Stop));
    for target in [FsmState::Init, FsmState::Idle, FsmState::Run] {
        assert!(matches!(
            fsm.request(Some(target)),
            TransitionResult::Rejected(_)
        ));
    }
    assert!(fsm.state().is_terminal());
}
