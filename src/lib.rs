// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! witness-kernel: the deterministic core of a peer-to-peer rumor/news ledger.
//!
//! Peers report events, other peers confirm them, and an event whose
//! confirmation count reaches the news threshold is promoted from rumor to
//! news. This crate holds the pure part of that system: identity derivation,
//! the replicated event model, the id-keyed event store and the confirmation
//! state machine. It performs no I/O; the node crate drives it.

pub mod config;
pub mod error;
pub mod types;
pub mod event;
pub mod identity;
pub mod state;
pub mod verify;

pub use error::{KernelError, KernelResult};
pub use event::{Event, Status, Transition};
pub use identity::derive_citizen_id;
pub use state::command::{Applied, Command, IgnoreReason, Outcome, Topic};
pub use state::kernel::KernelState;
pub use state::store::{BulkLoadReport, Entry, EventStore, SessionFlags};
pub use types::id::{CitizenId, EventId};

#[cfg(test)]
pub mod tests;
