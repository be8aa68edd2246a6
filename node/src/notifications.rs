// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Local, self-expiring status messages.
//!
//! The queue is plain data owned by the engine. Each entry gets its own
//! expiry timer (see `Engine`), which removes it by id through the engine's
//! command queue.

use std::collections::BTreeMap;

use serde::Serialize;

pub const SUCCESS_HEADER: &str = "Success";
pub const ERROR_HEADER: &str = "Error";
pub const NOTICE_HEADER: &str = "Notice";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Positive,
    Info,
    Warning,
    Negative,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Positive => "positive",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Negative => "negative",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub severity: Severity,
    pub header: String,
    pub message: String,
}

/// Change feed for presentation layers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotificationEvent {
    Posted(Notification),
    Expired(u64),
}

#[derive(Debug, Default)]
pub struct NotificationQueue {
    next_id: u64,
    active: BTreeMap<u64, Notification>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a notification with a fresh sequence id.
    pub fn enqueue(&mut self, severity: Severity, header: impl Into<String>, message: impl Into<String>) -> Notification {
        self.next_id += 1;
        let notification = Notification {
            id: self.next_id,
            severity,
            header: header.into(),
            message: message.into(),
        };
        self.active.insert(notification.id, notification.clone());
        notification
    }

    /// Removes an entry. Unknown ids are ignored.
    pub fn expire(&mut self, id: u64) -> Option<Notification> {
        self.active.remove(&id)
    }

    pub fn get(&self, id: u64) -> Option<&Notification> {
        self.active.get(&id)
    }

    /// Active notifications, oldest first.
    pub fn active(&self) -> impl Iterator<Item = &Notification> {
        self.active.values()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
