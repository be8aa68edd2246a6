// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Replicas fed the same messages in different orders must converge.

use crate::event::{Event, Status};
use crate::state::command::Topic;
use crate::state::kernel::KernelState;
use crate::tests::{citizen, confirmed, report};
use crate::types::id::EventId;

fn replay(me: &str, messages: &[(Topic, Event)]) -> KernelState {
    let mut kernel = KernelState::new(citizen(me));
    for (topic, event) in messages {
        kernel.apply_remote(*topic, event.clone()).unwrap();
    }
    kernel
}

fn assert_invariants(kernel: &KernelState) {
    for event in kernel.store().events() {
        assert_eq!(event.confirmed_by as usize, event.witnesses.len());
        assert!(!event.witnesses.contains(&event.reporter));
    }
}

#[test]
fn test_create_applied_twice_yields_one_event() {
    let create = (Topic::CreateEvent, report(1, "rep", "fire"));
    let kernel = replay("me", &[create.clone(), create]);
    assert_eq!(kernel.store().len(), 1);
}

#[test]
fn test_update_before_create_converges() {
    let base = report(1, "rep", "fire");
    let update = confirmed(base.clone(), "a", "seen");

    let in_order = replay("me", &[(Topic::CreateEvent, base.clone()), (Topic::UpdateEvent, update.clone())]);
    let reordered = replay("me", &[(Topic::UpdateEvent, update.clone()), (Topic::CreateEvent, base)]);

    assert_eq!(in_order.get(EventId(1)), Some(&update));
    assert_eq!(reordered.get(EventId(1)), Some(&update));
    assert_eq!(in_order.store().state_hash(), reordered.store().state_hash());
}

#[test]
fn test_all_orderings_converge() {
    let base = report(1, "rep", "fire");
    let once = confirmed(base.clone(), "a", "seen");
    let twice = confirmed(once.clone(), "b", "seen too");
    let other = report(2, "x", "flood");

    let messages = vec![
        (Topic::CreateEvent, base),
        (Topic::UpdateEvent, once),
        (Topic::UpdateEvent, twice.clone()),
        (Topic::CreateEvent, other),
    ];

    let reference = replay("me", &messages).store().state_hash();

    // Every rotation and its reverse.
    for shift in 0..messages.len() {
        let mut rotated = messages.clone();
        rotated.rotate_left(shift);
        let kernel = replay("me", &rotated);
        assert_eq!(kernel.store().state_hash(), reference, "rotation {shift}");
        assert_eq!(kernel.get(EventId(1)), Some(&twice));
        assert_invariants(&kernel);

        rotated.reverse();
        let kernel = replay("me", &rotated);
        assert_eq!(kernel.store().state_hash(), reference, "reversed rotation {shift}");
    }
}

#[test]
fn test_status_never_regresses() {
    let base = report(1, "rep", "fire");
    let once = confirmed(base.clone(), "a", "seen");
    let twice = confirmed(once.clone(), "b", "seen too");

    let mut kernel = KernelState::new(citizen("me"));
    kernel.apply_remote(Topic::UpdateEvent, twice).unwrap();
    for stale in [once, base] {
        kernel.apply_remote(Topic::UpdateEvent, stale).unwrap();
        assert_eq!(kernel.get(EventId(1)).unwrap().status(), Status::News);
    }
}

#[test]
fn test_hash_ignores_local_identity() {
    let messages = [(Topic::CreateEvent, report(1, "rep", "fire"))];
    let a = replay("rep", &messages);
    let b = replay("someone-else", &messages);
    assert_eq!(a.store().state_hash(), b.store().state_hash());
}
