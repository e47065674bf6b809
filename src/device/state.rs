use super::event::{EventKind, RawEvent};
use serde::Serialize;

/// Latest known value of every axis and button seen on one device.
///
/// Both sequences grow on demand up to the highest number seen; slots that
/// never received an event read as 0. Only successful reads on the owning
/// [`DeviceHandle`](super::DeviceHandle) mutate it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceState {
    axes: Vec<i16>,
    buttons: Vec<i16>,
}

impl DeviceState {
    pub fn axis_values(&self) -> &[i16] {
        &self.axes
    }

    pub fn button_values(&self) -> &[i16] {
        &self.buttons
    }

    /// `None` until an event for that axis has been stored.
    pub fn axis(&self, number: u8) -> Option<i16> {
        self.axes.get(number as usize).copied()
    }

    pub fn button(&self, number: u8) -> Option<i16> {
        self.buttons.get(number as usize).copied()
    }

    /// Stores the event's value. Returns false for types that carry no state.
    pub(crate) fn apply(&mut self, event: &RawEvent) -> bool {
        match event.kind() {
            EventKind::Axis => store(&mut self.axes, event.number, event.value),
            EventKind::Button => store(&mut self.buttons, event.number, event.value),
            EventKind::Other(_) => return false,
        }
        true
    }
}

fn store(values: &mut Vec<i16>, number: u8, value: i16) {
    let index = number as usize;
    if values.len() <= index {
        values.resize(index + 1, 0);
    }
    values[index] = value;
}
