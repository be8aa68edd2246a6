// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Kernel State definition.
//!
//! `KernelState` is the confirmation state machine. It is the only writer of
//! `confirmed_by`, `witnesses` and `details` for local actions, and the only
//! place peer records are merged into the store.
//!
//! Per event: `Rumor (confirmed_by < 2) -> News (confirmed_by >= 2)`. News is
//! terminal; details and witnesses keep growing independently of status.

use crate::error::{KernelError, Result};
use crate::event::{Event, Transition};
use crate::state::command::{Applied, Command, IgnoreReason, Outcome, Topic};
use crate::state::store::{BulkLoadReport, EventStore, Insert, Upsert};
use crate::types::id::{CitizenId, EventId};

pub struct KernelState {
    pub(crate) version: u64,
    pub(crate) store: EventStore,
}

impl KernelState {
    pub fn new(identity: CitizenId) -> Self {
        Self {
            version: 0,
            store: EventStore::new(identity),
        }
    }

    // --- Read APIs ---

    /// Number of accepted mutations, local or remote.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn identity(&self) -> &CitizenId {
        self.store.identity()
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.store.get(id)
    }

    // --- Write Logic ---

    pub fn bulk_load(&mut self, records: impl IntoIterator<Item = Event>) -> BulkLoadReport {
        let report = self.store.bulk_load(records);
        self.version += report.loaded as u64;
        report
    }

    pub fn apply(&mut self, cmd: &Command) -> Result<Outcome> {
        match cmd {
            Command::SubmitEvent { title, detail, location } => self.submit_event(title, detail, location),
            Command::AddDetail { id, text } => self.add_detail(*id, text),
            Command::ConfirmRumor { id, detail } => self.confirm_rumor(*id, detail.as_deref()),
        }
    }

    /// Reports a new event as the local citizen.
    ///
    /// A title that already exists is silently ignored so the same rumor is
    /// not reported twice.
    pub fn submit_event(&mut self, title: &str, detail: &str, location: &str) -> Result<Outcome> {
        if title.trim().is_empty() {
            return Err(KernelError::EmptyTitle);
        }
        if self.store.contains_title(title) {
            return Ok(Outcome::Ignored(IgnoreReason::DuplicateTitle));
        }

        let id = self.store.next_id();
        let event = Event::report(id, self.identity().clone(), title, detail, location);
        let transition = Transition::created(event.status());

        // next_id() is past every stored id, so this cannot collide locally.
        if self.store.insert(event.clone()) != Insert::Inserted {
            return Err(KernelError::InvariantViolation { id, reason: "allocated id already in use" });
        }
        self.version += 1;

        Ok(Outcome::Publish { topic: Topic::CreateEvent, event, transition })
    }

    /// Appends a detail. Anyone may add details, reporter included.
    pub fn add_detail(&mut self, id: EventId, text: &str) -> Result<Outcome> {
        if text.trim().is_empty() {
            return Err(KernelError::EmptyDetail);
        }

        let (event, transition) = self.store.modify(id, |event| event.details.push(text.to_string()))?;
        let event = event.clone();
        self.version += 1;

        Ok(Outcome::Publish { topic: Topic::UpdateEvent, event, transition })
    }

    /// Confirms a rumor as the local citizen.
    ///
    /// No-op for the event's reporter and for citizens who already confirmed it.
    pub fn confirm_rumor(&mut self, id: EventId, detail: Option<&str>) -> Result<Outcome> {
        let me = self.identity().clone();
        let current = self.store.get(id).ok_or(KernelError::NotFound(id))?;

        if current.is_reported_by(&me) {
            return Ok(Outcome::Ignored(IgnoreReason::SelfConfirmation));
        }
        if current.is_witnessed_by(&me) {
            return Ok(Outcome::Ignored(IgnoreReason::AlreadyWitness));
        }

        let account = detail.map(str::trim).filter(|d| !d.is_empty()).map(str::to_string);
        let (event, transition) = self.store.modify(id, |event| {
            event.confirmed_by += 1;
            event.witnesses.push(me);
            if let Some(account) = account {
                event.details.push(account);
            }
        })?;
        let event = event.clone();
        self.version += 1;

        Ok(Outcome::Publish { topic: Topic::UpdateEvent, event, transition })
    }

    /// Merges a record received from a peer. Never produces a publication.
    pub fn apply_remote(&mut self, topic: Topic, event: Event) -> Result<Applied> {
        event.validate()?;

        let status = event.status();
        let applied = match topic {
            Topic::CreateEvent => match self.store.insert(event) {
                Insert::Inserted => Applied::Inserted(Transition::created(status)),
                Insert::Duplicate => Applied::Duplicate,
                Insert::Conflict => Applied::Conflict,
            },
            Topic::UpdateEvent => match self.store.upsert_by_id(event) {
                Upsert::Inserted => Applied::Inserted(Transition::created(status)),
                Upsert::Replaced(t) => Applied::Replaced(t),
                Upsert::Unchanged => Applied::Unchanged,
                Upsert::Stale => Applied::Stale,
            },
        };

        if applied.changed() {
            self.version += 1;
        }
        Ok(applied)
    }
}
