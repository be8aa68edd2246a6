// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Configuration constants.

/// Confirmations required before a rumor becomes news.
pub const NEWS_THRESHOLD: u32 = 2;

/// Discriminator carried by every event document.
pub const EVENT_TYPE: &str = "event";

/// Number of trailing peer-id characters fed into citizen id derivation.
pub const CITIZEN_SUFFIX_LEN: usize = 8;

/// Bytes of the keyed hash kept for a citizen id (hex encoded, so twice as many chars).
pub const CITIZEN_ID_BYTES: usize = 8;

/// blake3 key-derivation context for the citizen id secret.
pub const IDENTITY_CONTEXT: &str = "witness-kernel 2025 citizen identifier v1";

/// First id handed out by an empty store.
pub const FIRST_EVENT_ID: u64 = 1;
