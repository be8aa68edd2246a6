// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Replicated event record.
//!
//! An `Event` is the only record kind shared between peers. The same JSON
//! document travels over both replication topics and is stored verbatim in
//! the durable document store:
//!
//! ```json
//! {"_id":"1","type":"event","confirmedBy":0,"title":"Fire on Main St",
//!  "details":["Flames on the 2nd floor"],"location":"Main St 12",
//!  "reporter":"3fa1c2d4e5b60718","witnesses":[]}
//! ```
//!
//! # Invariants
//! - `confirmed_by == witnesses.len()`
//! - `reporter` never appears in `witnesses`
//! - `details` only grows
//! - status is derived from `confirmed_by`, never stored

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::{EVENT_TYPE, NEWS_THRESHOLD};
use crate::error::{KernelError, KernelResult};
use crate::types::id::{CitizenId, EventId};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: EventId,
    /// Record discriminator, always `"event"`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "confirmedBy", default)]
    pub confirmed_by: u32,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub details: Vec<String>,
    #[serde(default)]
    pub location: String,
    pub reporter: CitizenId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub witnesses: Vec<CitizenId>,
}

// Peers emit `null` rather than `[]` for lists that were never appended to.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Event {
    /// A fresh, unconfirmed report.
    pub fn report(
        id: EventId,
        reporter: CitizenId,
        title: impl Into<String>,
        detail: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id,
            kind: EVENT_TYPE.to_string(),
            confirmed_by: 0,
            title: title.into(),
            details: vec![detail.into()],
            location: location.into(),
            reporter,
            witnesses: Vec::new(),
        }
    }

    pub fn status(&self) -> Status {
        Status::from_confirmations(self.confirmed_by)
    }

    pub fn is_reported_by(&self, citizen: &CitizenId) -> bool {
        &self.reporter == citizen
    }

    pub fn is_witnessed_by(&self, citizen: &CitizenId) -> bool {
        self.witnesses.iter().any(|w| w == citizen)
    }

    /// Checks the structural invariants a record must hold before it is stored.
    pub fn validate(&self) -> KernelResult<()> {
        if self.kind != EVENT_TYPE {
            return Err(self.violation("record type is not \"event\""));
        }
        if self.confirmed_by as usize != self.witnesses.len() {
            return Err(self.violation("confirmedBy does not match the witness count"));
        }
        if self.is_witnessed_by(&self.reporter) {
            return Err(self.violation("reporter is listed as a witness"));
        }
        Ok(())
    }

    fn violation(&self, reason: &'static str) -> KernelError {
        KernelError::InvariantViolation { id: self.id, reason }
    }

    pub fn to_json(&self) -> KernelResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| KernelError::Encoding(e.to_string()))
    }

    pub fn from_json(bytes: &[u8]) -> KernelResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| KernelError::Encoding(e.to_string()))
    }

    pub fn from_value(value: serde_json::Value) -> KernelResult<Self> {
        serde_json::from_value(value).map_err(|e| KernelError::Encoding(e.to_string()))
    }
}

/// Derived credibility of an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    Rumor,
    News,
}

impl Status {
    pub fn from_confirmations(confirmed_by: u32) -> Self {
        if confirmed_by >= NEWS_THRESHOLD {
            Status::News
        } else {
            Status::Rumor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Rumor => "rumor",
            Status::News => "news",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status before and after a mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: Status,
    pub to: Status,
}

impl Transition {
    pub fn new(from: Status, to: Status) -> Self {
        Self { from, to }
    }

    /// A freshly created record starts out as whatever it arrives as.
    pub fn created(status: Status) -> Self {
        Self { from: status, to: status }
    }

    pub fn promoted(&self) -> bool {
        self.from == Status::Rumor && self.to == Status::News
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Event {
        Event::report(EventId(7), CitizenId::from("r1"), "Fire on Main St", "Flames", "Main St")
    }

    #[test]
    fn test_wire_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["_id"], json!("7"));
        assert_eq!(value["type"], json!("event"));
        assert_eq!(value["confirmedBy"], json!(0));
        assert_eq!(value["details"], json!(["Flames"]));
        assert_eq!(value["witnesses"], json!([]));
        assert_eq!(value["reporter"], json!("r1"));
    }

    #[test]
    fn test_decode_tolerates_null_lists() {
        let raw = br#"{"_id":"3","type":"event","confirmedBy":0,"title":"t","details":null,"location":"x","reporter":"r","witnesses":null}"#;
        let event = Event::from_json(raw).unwrap();
        assert_eq!(event.id, EventId(3));
        assert!(event.details.is_empty());
        assert!(event.witnesses.is_empty());
        assert!(event.validate().is_ok());
    }

    #[test]
    fn test_decode_rejects_non_numeric_id() {
        let raw = br#"{"_id":"abc","type":"event","confirmedBy":0,"title":"t","details":[],"location":"","reporter":"r","witnesses":[]}"#;
        assert!(matches!(Event::from_json(raw), Err(KernelError::Encoding(_))));
    }

    #[test]
    fn test_validate_catches_count_mismatch() {
        let mut event = sample();
        event.confirmed_by = 1;
        assert!(matches!(event.validate(), Err(KernelError::InvariantViolation { .. })));
    }

    #[test]
    fn test_validate_catches_reporter_witness() {
        let mut event = sample();
        event.witnesses.push(CitizenId::from("r1"));
        event.confirmed_by = 1;
        assert!(matches!(event.validate(), Err(KernelError::InvariantViolation { .. })));
    }

    #[test]
    fn test_status_threshold() {
        assert_eq!(Status::from_confirmations(0), Status::Rumor);
        assert_eq!(Status::from_confirmations(1), Status::Rumor);
        assert_eq!(Status::from_confirmations(2), Status::News);
        assert!(Transition::new(Status::Rumor, Status::News).promoted());
        assert!(!Transition::created(Status::News).promoted());
    }
}
