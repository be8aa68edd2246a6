// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Kernel commands and their outcomes.

use core::fmt;

use crate::event::{Event, Transition};
use crate::types::id::EventId;

/// Actions a local citizen can take.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    SubmitEvent {
        title: String,
        detail: String,
        location: String,
    },
    AddDetail {
        id: EventId,
        text: String,
    },
    /// `detail` is the witness's own account, appended when present.
    ConfirmRumor {
        id: EventId,
        detail: Option<String>,
    },
}

impl Command {
    pub fn kind(&self) -> &'static str {
        match self {
            Command::SubmitEvent { .. } => "SubmitEvent",
            Command::AddDetail { .. } => "AddDetail",
            Command::ConfirmRumor { .. } => "ConfirmRumor",
        }
    }
}

/// Replication topics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    CreateEvent,
    UpdateEvent,
}

impl Topic {
    pub const ALL: [Topic; 2] = [Topic::CreateEvent, Topic::UpdateEvent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::CreateEvent => "create-event",
            Topic::UpdateEvent => "update-event",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a command was accepted without changing anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// An event with the exact same title already exists.
    DuplicateTitle,
    /// Reporters cannot confirm their own events.
    SelfConfirmation,
    /// The citizen is already a witness of this event.
    AlreadyWitness,
}

/// Result of a local command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The store changed; `event` must be persisted and published on `topic`.
    Publish {
        topic: Topic,
        event: Event,
        transition: Transition,
    },
    Ignored(IgnoreReason),
}

impl Outcome {
    pub fn event(&self) -> Option<&Event> {
        match self {
            Outcome::Publish { event, .. } => Some(event),
            Outcome::Ignored(_) => None,
        }
    }
}

/// Result of applying a record received from a peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    Inserted(Transition),
    Replaced(Transition),
    Duplicate,
    Conflict,
    Unchanged,
    Stale,
}

impl Applied {
    pub fn transition(&self) -> Option<Transition> {
        match self {
            Applied::Inserted(t) | Applied::Replaced(t) => Some(*t),
            _ => None,
        }
    }

    pub fn changed(&self) -> bool {
        self.transition().is_some()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Applied::Inserted(_) => "inserted",
            Applied::Replaced(_) => "replaced",
            Applied::Duplicate => "duplicate",
            Applied::Conflict => "conflict",
            Applied::Unchanged => "unchanged",
            Applied::Stale => "stale",
        }
    }
}
