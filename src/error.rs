// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use thiserror::Error;

use crate::types::id::EventId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    /// No event with this id is known locally.
    #[error("event {0} not found")]
    NotFound(EventId),
    /// A report needs a non-blank title.
    #[error("event title must not be empty")]
    EmptyTitle,
    /// A detail contribution needs some text.
    #[error("detail text must not be empty")]
    EmptyDetail,
    /// A record breaks the confirmation invariants and cannot be stored.
    #[error("event {id} violates invariant: {reason}")]
    InvariantViolation { id: EventId, reason: &'static str },
    /// The peer identifier cannot produce a citizen id.
    #[error("invalid peer identity: {0}")]
    InvalidIdentity(&'static str),
    /// Wire encoding or decoding failed.
    #[error("encoding error: {0}")]
    Encoding(String),
}

pub type KernelResult<T> = core::result::Result<T, KernelError>;
pub type Result<T> = KernelResult<T>;
