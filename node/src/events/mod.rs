// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! File-backed persistence for event documents.
//!
//! # Guarantees
//! - Documents are fsync'd before `put` returns
//! - Append-only; replay rebuilds the latest document per id
//! - A torn final line never prevents startup

pub mod event_log;

pub use event_log::DocumentLog;
