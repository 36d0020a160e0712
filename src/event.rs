//! Event definitions
//!
//! An [`Event`] is the immutable record of one store mutation. Loggers assign
//! the sequence number; everything else is fixed when the event is built.

use serde::{Deserialize, Serialize};

/// Kind of mutation an event records
///
/// The numeric codes are part of the on-disk format (`Delete = 1`,
/// `Put = 2`) and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventKind {
    Delete = 1,
    Put = 2,
}

impl EventKind {
    /// Numeric code used by the log formats
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Inverse of [`EventKind::code`]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(EventKind::Delete),
            2 => Some(EventKind::Put),
            _ => None,
        }
    }
}

/// A single logged mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Logger-assigned, strictly increasing; 0 until assigned
    pub sequence: u64,

    /// The mutation performed
    pub kind: EventKind,

    /// Key affected by the mutation
    pub key: String,

    /// New value for a put, empty for a delete
    pub value: String,
}

impl Event {
    /// Unsequenced put event
    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            sequence: 0,
            kind: EventKind::Put,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Unsequenced delete event
    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            sequence: 0,
            kind: EventKind::Delete,
            key: key.into(),
            value: String::new(),
        }
    }

    /// Copy of this event stamped with `sequence`
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }
}
