// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use thiserror::Error;
use witness_kernel::error::KernelError;

use crate::network::TransportError;
use crate::persistence::StoreError;

#[derive(Error, Debug)]
pub enum NodeError {
    /// The peer identity could not be established. Fatal at startup.
    #[error("Identity unavailable: {0}")]
    IdentityUnavailable(String),
    #[error("Malformed replication message on {topic}: {reason}")]
    MalformedReplicationMessage { topic: &'static str, reason: String },
    #[error("Durable store unavailable: {0}")]
    DurableStoreUnavailable(String),
    #[error("Publish failed on {topic}: {reason}")]
    PublishFailure { topic: &'static str, reason: String },
    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Engine stopped")]
    EngineStopped,
}
