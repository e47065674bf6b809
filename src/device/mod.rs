//! Linux joydev device access
//!
//! Implements the acquisition pipeline for `/dev/input/js*` nodes:
//!
//! 1. [`handle`] - Open/close and the event read loop ([`DeviceHandle::read_event`])
//! 2. [`capability`] - ioctl queries (axes, buttons, name, version, axis map)
//! 3. [`event`] - 8-byte record decoding
//! 4. [`state`] - Latest value per axis and button
//!
//! # Architecture
//!
//! ```text
//! js node ──► read (blocking pool / O_NONBLOCK) ──► RawEvent::decode ──► DeviceState
//!                                                        │                  │
//!                                                        ▼                  ▼
//!                                                     caller         watch subscribers
//! ```

pub mod capability;
pub mod error;
pub mod event;
pub mod handle;
pub(crate) mod io;
pub mod ioctl;
pub mod state;

pub use capability::{Capabilities, DriverVersion, UNKNOWN_NAME};
pub use error::JoystickError;
pub use event::{EventKind, RawEvent, EVENT_SIZE, JS_EVENT_AXIS, JS_EVENT_BUTTON, JS_EVENT_INIT};
pub use handle::{DeviceHandle, ReadMode};
pub use state::DeviceState;
