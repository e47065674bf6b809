//! Xbox 360 pad layout on top of the generic joydev handle
//!
//! The xpad driver reports the pad as eight axes (thumbs, analog triggers,
//! D-pad) and a run of buttons. This module labels them for display and offers
//! the drain-style helpers used by polling front ends.

use crate::device::{DeviceHandle, EventKind, JoystickError, RawEvent, ReadMode};
use std::path::Path;
use tracing::debug;

pub const LEFT_TRIGGER_AXIS: u8 = 2;
pub const RIGHT_TRIGGER_AXIS: u8 = 5;
pub const START_BUTTON: u8 = 7;

/// Width of the i16 axis range the driver actually uses (-32767..=32767).
const AXIS_SPAN: i32 = 65534;

pub fn axis_label(number: u8) -> Option<&'static str> {
    match number {
        0 => Some("Left thumb X"),
        1 => Some("Left thumb Y"),
        2 => Some("Left trigger"),
        3 => Some("Right thumb X"),
        4 => Some("Right thumb Y"),
        5 => Some("Right trigger"),
        6 => Some("D-pad X"),
        7 => Some("D-pad Y"),
        _ => None,
    }
}

/// One-line description, e.g. `"Left trigger: -32767"` or `"Button 7 PRESS"`.
pub fn describe_event(event: &RawEvent) -> String {
    match event.kind() {
        EventKind::Axis => match axis_label(event.number) {
            Some(label) => format!("{}: {}", label, event.value),
            None => format!("Axis {}: {}", event.number, event.value),
        },
        EventKind::Button => format!(
            "Button {} {}",
            event.number,
            if event.value == 0 { "RELEASE" } else { "PRESS" }
        ),
        EventKind::Other(_) => format!("Unknown {}: {}", event.number, event.value),
    }
}

/// Trigger travel in percent, 0 fully released and 100 fully pressed.
///
/// Always within `0..=100`; `i16::MIN`, which the driver never reports, counts
/// as fully released.
pub fn trigger_percent(value: i16) -> i32 {
    let offset = (value as i32).max(-32767) + 32767;
    offset * 100 / AXIS_SPAN
}

/// Maps an axis value onto `0..cells` (e.g. a terminal column).
pub fn scale_to_cells(value: i16, cells: u32) -> u32 {
    if cells == 0 {
        return 0;
    }
    let offset = (value as i64 + 32767).max(0);
    ((cells as i64 - 1) * offset / AXIS_SPAN as i64) as u32
}

/// An Xbox 360 pad behind a joydev node.
#[derive(Debug)]
pub struct Xbox360Controller {
    device: DeviceHandle,
}

impl Xbox360Controller {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JoystickError> {
        Ok(Self {
            device: DeviceHandle::open(path)?,
        })
    }

    pub fn device(&self) -> &DeviceHandle {
        &self.device
    }

    /// Consumes every pending event without blocking and returns the last
    /// button pressed among them, if any.
    pub async fn pressed_button(&self) -> Result<Option<u8>, JoystickError> {
        let mut pressed = None;
        while let Some(event) = self.device.read_event(ReadMode::NonBlocking).await? {
            if event.kind() == EventKind::Button && event.value == 1 {
                pressed = Some(event.number);
            }
        }
        debug!("Drained pending events, last pressed button: {:?}", pressed);
        Ok(pressed)
    }

    /// Consumes every pending event without blocking and returns the left
    /// stick position once both of its axes have been reported.
    pub async fn left_stick(&self) -> Result<Option<(i16, i16)>, JoystickError> {
        while self
            .device
            .read_event(ReadMode::NonBlocking)
            .await?
            .is_some()
        {}
        let state = self.device.state();
        Ok(state.axis(0).zip(state.axis(1)))
    }

    pub fn close(&self) -> Result<(), JoystickError> {
        self.device.close()
    }
}
