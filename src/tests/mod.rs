pub mod determinism_tests;

use crate::event::Event;
use crate::types::id::{CitizenId, EventId};

pub(crate) fn citizen(name: &str) -> CitizenId {
    CitizenId::from(name)
}

pub(crate) fn report(id: u64, reporter: &str, title: &str) -> Event {
    Event::report(EventId(id), citizen(reporter), title, "first account", "somewhere")
}

/// `event` after `witness` confirmed it with an account.
pub(crate) fn confirmed(mut event: Event, witness: &str, account: &str) -> Event {
    event.confirmed_by += 1;
    event.witnesses.push(citizen(witness));
    event.details.push(account.to_string());
    event
}
