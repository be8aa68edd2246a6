// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! witness-node: async host for the witness kernel.
//!
//! Wires a [`witness_kernel::KernelState`] to a peer network and a shared
//! document store. One engine task owns the replica; listeners, delivery
//! tasks and expiry timers talk to it through [`engine::EngineHandle`].

pub mod config;
pub mod errors;
pub mod network;
pub mod persistence;
pub mod events;
pub mod telemetry;
pub mod notifications;
pub mod replication;
pub mod engine;
pub mod peer;

pub use engine::{ActionOutcome, EngineHandle};
pub use errors::NodeError;
pub use peer::Peer;
