// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Citizen identity derivation.
//!
//! A citizen id is the short key a peer signs its reports and confirmations
//! with. It is computed from the tail of the network peer id, keyed by a
//! secret shared by all peers, so one peer always maps to the same citizen id
//! while the peer id cannot be read back off a published record.

use crate::config::{CITIZEN_ID_BYTES, CITIZEN_SUFFIX_LEN, IDENTITY_CONTEXT};
use crate::error::{KernelError, KernelResult};
use crate::types::id::CitizenId;

/// Derives the citizen id for `peer_id` under `secret`.
///
/// Only the last [`CITIZEN_SUFFIX_LEN`] characters of the peer id take part;
/// shorter ids are used whole.
pub fn derive_citizen_id(peer_id: &str, secret: &str) -> KernelResult<CitizenId> {
    let peer_id = peer_id.trim();
    if peer_id.is_empty() {
        return Err(KernelError::InvalidIdentity("peer id is empty"));
    }

    let chars: Vec<char> = peer_id.chars().collect();
    let start = chars.len().saturating_sub(CITIZEN_SUFFIX_LEN);
    let suffix: String = chars[start..].iter().collect();

    let key = blake3::derive_key(IDENTITY_CONTEXT, secret.as_bytes());
    let digest = blake3::keyed_hash(&key, suffix.as_bytes());

    Ok(CitizenId(hex::encode(&digest.as_bytes()[..CITIZEN_ID_BYTES])))
}
