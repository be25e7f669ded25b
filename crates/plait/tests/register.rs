//! Register histories: the classic distributed-systems-quiz scenarios, in
//! both operation and event form, plus boundary behavior.

use std::time::Duration;

use plait::{
    check_events, check_operations, check_operations_timeout, check_operations_verbose,
    CheckResult, Event, EventValue, Model, Operation,
};
use plait_models::{Register, RegisterOp};

fn put(client_id: usize, value: i64, call: i64, ret: i64) -> Operation<RegisterOp, i64> {
    Operation {
        client_id,
        input: RegisterOp::Put(value),
        call,
        output: 0,
        ret,
    }
}

fn get(client_id: usize, output: i64, call: i64, ret: i64) -> Operation<RegisterOp, i64> {
    Operation {
        client_id,
        input: RegisterOp::Get,
        call,
        output,
        ret,
    }
}

fn call_put(client_id: usize, id: usize, value: i64) -> Event<RegisterOp, i64> {
    Event {
        client_id,
        id,
        value: EventValue::Call(RegisterOp::Put(value)),
    }
}

fn call_get(client_id: usize, id: usize) -> Event<RegisterOp, i64> {
    Event {
        client_id,
        id,
        value: EventValue::Call(RegisterOp::Get),
    }
}

fn ret(client_id: usize, id: usize, output: i64) -> Event<RegisterOp, i64> {
    Event {
        client_id,
        id,
        value: EventValue::Return(output),
    }
}

#[test]
fn test_concurrent_reads_straddling_a_write() {
    // The stale read at [30,60] linearizes before the write takes effect;
    // the read at [25,75] after.
    let ops = vec![put(0, 100, 0, 100), get(1, 100, 25, 75), get(2, 0, 30, 60)];
    assert!(check_operations(&Register::default(), ops).unwrap());
}

#[test]
fn test_stale_read_after_fresh_read_is_illegal() {
    // get -> 0 at [40,90] starts after get -> 200 returned at 30: the write
    // already took effect, so the stale read cannot be ordered anywhere.
    let ops = vec![put(0, 200, 0, 100), get(1, 200, 10, 30), get(2, 0, 40, 90)];
    assert!(!check_operations(&Register::default(), ops).unwrap());
}

#[test]
fn test_event_form_interleaved_reads_ok() {
    let events = vec![
        call_put(0, 0, 100),
        call_get(1, 1),
        call_get(2, 2),
        ret(2, 2, 0),
        ret(1, 1, 100),
        ret(0, 0, 0),
    ];
    assert!(check_events(&Register::default(), events).unwrap());
}

#[test]
fn test_event_form_stale_read_illegal() {
    let events = vec![
        call_put(0, 0, 200),
        call_get(1, 1),
        ret(1, 1, 200),
        call_get(2, 2),
        ret(2, 2, 0),
        ret(0, 0, 0),
    ];
    assert!(!check_events(&Register::default(), events).unwrap());
}

#[test]
fn test_closed_intervals_make_touching_ops_concurrent() {
    // Both instantaneous reads at t=30 overlap the fresh read [25,75] only
    // at its boundary; closed-interval semantics still let them linearize
    // before the write takes effect.
    let ops = vec![
        put(0, 100, 0, 100),
        get(1, 100, 25, 75),
        get(2, 0, 30, 30),
        get(3, 0, 30, 30),
    ];
    assert!(check_operations(&Register::default(), ops).unwrap());
}

#[test]
fn test_empty_history_is_ok() {
    assert!(check_operations(&Register::default(), vec![]).unwrap());
    let (result, info) =
        check_operations_verbose(&Register::default(), vec![], None).unwrap();
    assert_eq!(result, CheckResult::Ok);
    assert_eq!(info.num_partitions(), 1);
    assert!(info.partial_linearizations(0).is_empty());
}

#[test]
fn test_single_operation_matches_step() {
    let register = Register::default();
    assert!(check_operations(&register, vec![get(0, 0, 0, 1)]).unwrap());
    assert!(!check_operations(&register, vec![get(0, 1, 0, 1)]).unwrap());
    assert!(check_operations(&register, vec![put(0, 9, 0, 1)]).unwrap());
}

#[test]
fn test_nonzero_initial_value() {
    let register = Register { initial: 42 };
    assert!(check_operations(&register, vec![get(0, 42, 0, 1)]).unwrap());
    assert!(!check_operations(&register, vec![get(0, 0, 0, 1)]).unwrap());
}

#[test]
fn test_timeout_reports_unknown() {
    // Twenty fully concurrent writes and a read of a value never written:
    // not linearizable, but the refutation has to enumerate write subsets.
    // A zero budget cuts the search off almost immediately.
    let mut ops: Vec<Operation<RegisterOp, i64>> =
        (1..=20).map(|v| put(v as usize, v, 0, 1000)).collect();
    ops.push(get(0, 999, 0, 1000));
    let result =
        check_operations_timeout(&Register::default(), ops, Some(Duration::ZERO)).unwrap();
    assert_eq!(result, CheckResult::Unknown);
}

#[test]
fn test_timeout_none_still_decides() {
    let ops = vec![put(0, 200, 0, 100), get(1, 200, 10, 30), get(2, 0, 40, 90)];
    let result = check_operations_timeout(&Register::default(), ops, None).unwrap();
    assert_eq!(result, CheckResult::Illegal);
}

#[test]
fn test_verbose_witnesses_replay_against_the_model() {
    let register = Register::default();
    let ops = vec![put(0, 200, 0, 100), get(1, 200, 10, 30), get(2, 0, 40, 90)];
    let (result, info) = check_operations_verbose(&register, ops, None).unwrap();
    assert_eq!(result, CheckResult::Illegal);
    assert_eq!(info.num_partitions(), 1);

    let partials = info.partial_linearizations(0);
    assert!(!partials.is_empty());
    for partial in partials {
        // Every witness is a prefix the model accepts from its initial
        // state; ids are distinct and in range.
        let inputs = [RegisterOp::Put(200), RegisterOp::Get, RegisterOp::Get];
        let outputs = [0, 200, 0];
        let mut state = register.init();
        let mut seen = std::collections::HashSet::new();
        for &id in partial {
            assert!(id < 3);
            assert!(seen.insert(id), "id {id} repeated in witness");
            state = register
                .step(&state, &inputs[id], &outputs[id])
                .expect("witness step must be admissible");
        }
    }
    // put(200) then get -> 200 is linearizable, so some witness reaches
    // depth two.
    assert!(partials.iter().any(|p| p.len() == 2));
}

#[test]
fn test_verbose_ok_yields_one_complete_linearization() {
    let ops = vec![put(0, 100, 0, 100), get(1, 100, 25, 75), get(2, 0, 30, 60)];
    let (result, info) = check_operations_verbose(&Register::default(), ops, None).unwrap();
    assert_eq!(result, CheckResult::Ok);
    let partials = info.partial_linearizations(0);
    assert_eq!(partials.len(), 1);
    assert_eq!(partials[0].len(), 3);
}
