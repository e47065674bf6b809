//! joydev event records.
//!
//! The driver delivers fixed 8-byte records in host byte order:
//!
//! ```text
//! u32 time | i16 value | u8 type | u8 number
//! ```
//!
//! `type` carries [`JS_EVENT_INIT`] on the synthetic events the driver emits right
//! after open to report the current state of every axis and button.

use super::error::JoystickError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of one event record.
pub const EVENT_SIZE: usize = 8;

pub const JS_EVENT_BUTTON: u8 = 0x01;
pub const JS_EVENT_AXIS: u8 = 0x02;
pub const JS_EVENT_INIT: u8 = 0x80;

/// Event classification once the INIT bit is masked off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Axis,
    Button,
    /// Unrecognized type value, passed through untouched
    Other(u8),
}

impl EventKind {
    pub fn from_type(type_tag: u8) -> Self {
        match type_tag & !JS_EVENT_INIT {
            JS_EVENT_AXIS => EventKind::Axis,
            JS_EVENT_BUTTON => EventKind::Button,
            other => EventKind::Other(other),
        }
    }

    /// Numeric type value without the INIT bit.
    pub fn raw(self) -> u8 {
        match self {
            EventKind::Axis => JS_EVENT_AXIS,
            EventKind::Button => JS_EVENT_BUTTON,
            EventKind::Other(value) => value,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Axis => f.write_str("axis"),
            EventKind::Button => f.write_str("button"),
            EventKind::Other(value) => write!(f, "{}", value),
        }
    }
}

/// One decoded record. Produced fresh by every successful read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    /// Device-relative timestamp in milliseconds, not wall-clock
    pub time: u32,
    pub value: i16,
    /// Type byte as read, INIT bit included
    pub type_tag: u8,
    /// Axis or button number
    pub number: u8,
}

impl RawEvent {
    /// Decodes a record, rejecting anything that is not exactly [`EVENT_SIZE`] bytes.
    pub fn decode(record: &[u8]) -> Result<Self, JoystickError> {
        let record: &[u8; EVENT_SIZE] =
            record
                .try_into()
                .map_err(|_| JoystickError::DecodeError {
                    expected: EVENT_SIZE,
                    actual: record.len(),
                })?;
        Ok(Self::from_record(record))
    }

    pub fn from_record(record: &[u8; EVENT_SIZE]) -> Self {
        Self {
            time: u32::from_ne_bytes([record[0], record[1], record[2], record[3]]),
            value: i16::from_ne_bytes([record[4], record[5]]),
            type_tag: record[6],
            number: record[7],
        }
    }

    /// Inverse of [`from_record`](Self::from_record).
    pub fn to_record(&self) -> [u8; EVENT_SIZE] {
        let mut record = [0u8; EVENT_SIZE];
        record[0..4].copy_from_slice(&self.time.to_ne_bytes());
        record[4..6].copy_from_slice(&self.value.to_ne_bytes());
        record[6] = self.type_tag;
        record[7] = self.number;
        record
    }

    pub fn kind(&self) -> EventKind {
        EventKind::from_type(self.type_tag)
    }

    /// True for the synthetic state reports sent right after open.
    pub fn is_init(&self) -> bool {
        self.type_tag & JS_EVENT_INIT != 0
    }
}

impl fmt::Display for RawEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} = {} @ {}ms{}",
            self.kind(),
            self.number,
            self.value,
            self.time,
            if self.is_init() { " (init)" } else { "" }
        )
    }
}
