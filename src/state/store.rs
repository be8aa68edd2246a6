// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event Store - the local replica of every known event.
//!
//! Events are keyed by their numeric id and iterated in ascending id order.
//! Ids are never used as positions: they may have gaps and may arrive in any
//! order.
//!
//! Each entry carries session flags derived from the local citizen id. They
//! are recomputed on every insert, upsert and mutation, never stored on the
//! wire.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::config::FIRST_EVENT_ID;
use crate::error::{KernelError, KernelResult};
use crate::event::{Event, Status, Transition};
use crate::types::id::{CitizenId, EventId};

/// Per-event view flags for the local citizen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionFlags {
    pub reported_by_me: bool,
    pub witnessed_by_me: bool,
}

impl SessionFlags {
    pub fn derive(me: &CitizenId, event: &Event) -> Self {
        Self {
            reported_by_me: event.is_reported_by(me),
            witnessed_by_me: event.is_witnessed_by(me),
        }
    }

    /// Reporters and existing witnesses have nothing left to confirm.
    pub fn can_confirm(&self) -> bool {
        !self.reported_by_me && !self.witnessed_by_me
    }

    /// Advisory only: the state machine accepts details from anyone.
    pub fn can_add_detail(&self) -> bool {
        !self.reported_by_me && !self.witnessed_by_me
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub event: Event,
    pub flags: SessionFlags,
}

impl Entry {
    pub fn status(&self) -> Status {
        self.event.status()
    }
}

/// Result of inserting a created event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Insert {
    Inserted,
    /// Same id, same reporter and title: a redelivered create.
    Duplicate,
    /// Same id claimed by a different report. The stored record is kept.
    Conflict,
}

/// Result of an id-keyed upsert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced(Transition),
    Unchanged,
    /// The incoming record is behind the stored one and was dropped.
    Stale,
}

/// Outcome of a bulk load from the durable store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BulkLoadReport {
    pub loaded: usize,
    pub ignored: usize,
    pub rejected: usize,
}

pub struct EventStore {
    me: CitizenId,
    entries: BTreeMap<EventId, Entry>,
    // title -> number of events carrying it
    titles: FxHashMap<String, usize>,
}

impl EventStore {
    pub fn new(me: CitizenId) -> Self {
        Self {
            me,
            entries: BTreeMap::new(),
            titles: FxHashMap::default(),
        }
    }

    pub fn identity(&self) -> &CitizenId {
        &self.me
    }

    // --- Read APIs ---

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.entries.get(&id).map(|e| &e.event)
    }

    pub fn entry(&self, id: EventId) -> Option<&Entry> {
        self.entries.get(&id)
    }

    /// Entries in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.entries.values().map(|e| &e.event)
    }

    pub fn rumors(&self) -> impl Iterator<Item = &Entry> {
        self.iter().filter(|e| e.status() == Status::Rumor)
    }

    pub fn news(&self) -> impl Iterator<Item = &Entry> {
        self.iter().filter(|e| e.status() == Status::News)
    }

    pub fn has_news(&self) -> bool {
        self.news().next().is_some()
    }

    /// Exact, case-sensitive title match.
    pub fn contains_title(&self, title: &str) -> bool {
        self.titles.contains_key(title)
    }

    /// `max(id) + 1`, or the first id when empty.
    ///
    /// Only unique among the events this peer knows about; two peers
    /// reporting at once can pick the same id.
    pub fn next_id(&self) -> EventId {
        self.entries
            .keys()
            .next_back()
            .map(EventId::next)
            .unwrap_or(EventId(FIRST_EVENT_ID))
    }

    pub fn state_hash(&self) -> [u8; 32] {
        crate::verify::store_state_hash(self)
    }

    // --- Write Logic ---

    /// Merges records read back from the durable store.
    pub fn bulk_load(&mut self, records: impl IntoIterator<Item = Event>) -> BulkLoadReport {
        let mut report = BulkLoadReport::default();
        for event in records {
            if event.validate().is_err() {
                report.rejected += 1;
                continue;
            }
            match self.upsert_by_id(event) {
                Upsert::Inserted | Upsert::Replaced(_) => report.loaded += 1,
                Upsert::Unchanged | Upsert::Stale => report.ignored += 1,
            }
        }
        report
    }

    pub fn insert(&mut self, event: Event) -> Insert {
        if let Some(existing) = self.entries.get(&event.id) {
            let same_report = existing.event.reporter == event.reporter && existing.event.title == event.title;
            return if same_report { Insert::Duplicate } else { Insert::Conflict };
        }
        self.put(event);
        Insert::Inserted
    }

    /// Replaces the record with the same id, or inserts it if unknown.
    ///
    /// Last writer wins, except that a record with fewer confirmations, or
    /// as many confirmations and fewer details, never overwrites the stored
    /// one. Status is monotonic. The detail list is only protected at equal
    /// confirmation counts: a record with more confirmations replaces the
    /// stored one even if it carries fewer details.
    pub fn upsert_by_id(&mut self, event: Event) -> Upsert {
        if !self.entries.contains_key(&event.id) {
            self.put(event);
            return Upsert::Inserted;
        }

        let current = &self.entries[&event.id];
        if current.event == event {
            return Upsert::Unchanged;
        }
        if is_stale(&current.event, &event) {
            return Upsert::Stale;
        }

        let transition = Transition::new(current.status(), event.status());
        self.put(event);
        Upsert::Replaced(transition)
    }

    /// Applies `f` to a stored event and refreshes its derived state.
    pub(crate) fn modify<F>(&mut self, id: EventId, f: F) -> KernelResult<(&Event, Transition)>
    where
        F: FnOnce(&mut Event),
    {
        let entry = self.entries.get_mut(&id).ok_or(KernelError::NotFound(id))?;
        let before = entry.status();
        let old_title = entry.event.title.clone();

        f(&mut entry.event);
        entry.flags = SessionFlags::derive(&self.me, &entry.event);
        let transition = Transition::new(before, entry.status());

        if entry.event.title != old_title {
            let new_title = entry.event.title.clone();
            unindex_title(&mut self.titles, &old_title);
            *self.titles.entry(new_title).or_insert(0) += 1;
        }

        let entry = &self.entries[&id];
        Ok((&entry.event, transition))
    }

    fn put(&mut self, event: Event) {
        let flags = SessionFlags::derive(&self.me, &event);
        *self.titles.entry(event.title.clone()).or_insert(0) += 1;
        if let Some(old) = self.entries.insert(event.id, Entry { event, flags }) {
            unindex_title(&mut self.titles, &old.event.title);
        }
    }
}

fn is_stale(current: &Event, incoming: &Event) -> bool {
    incoming.confirmed_by < current.confirmed_by
        || (incoming.confirmed_by == current.confirmed_by && incoming.details.len() < current.details.len())
}

fn unindex_title(titles: &mut FxHashMap<String, usize>, title: &str) {
    if let Some(count) = titles.get_mut(title) {
        *count -= 1;
        if *count == 0 {
            titles.remove(title);
        }
    }
}
