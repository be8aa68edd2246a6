//! Deterministic Hashing and Verification.

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::event::Event;
use crate::state::store::EventStore;

/// Computes the cryptographic hash of an event store.
///
/// **Scope**: replicated content only, in ascending id order. Two peers
/// that have converged produce the same hash.
///
/// It explicitly **EXCLUDES**:
/// - Session flags (they depend on the local citizen)
/// - The kernel version counter
pub fn store_state_hash(store: &EventStore) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();

    hasher.update(&(store.len() as u64).to_le_bytes());
    for event in store.events() {
        hasher.update(&event_hash(event));
    }

    *hasher.finalize().as_bytes()
}

/// Hash of a single record's canonical bincode encoding.
pub fn event_hash(event: &Event) -> [u8; 32] {
    match bincode::serde::encode_to_vec(event, bincode::config::standard()) {
        Ok(bytes) => blake3::hash(&bytes).into(),
        // Unreachable for strings and integers.
        Err(_) => blake3::hash(&serde_json::to_vec(event).unwrap_or_default()).into(),
    }
}
