//! Linux joystick (joydev) devices as an object model.
//!
//! Open a `/dev/input/js*` node with [`DeviceHandle::open`], query it through
//! the capability methods, and pull decoded events with
//! [`DeviceHandle::read_event`]; each read also updates the handle's
//! [`DeviceState`]. Six-axis accelerometer reports are read separately through
//! [`SixAxis`].
//!
//! ```no_run
//! use joystick::{DeviceHandle, ReadMode};
//!
//! # async fn demo() -> Result<(), joystick::JoystickError> {
//! let device = DeviceHandle::open("/dev/input/js0")?;
//! println!("{}", device.describe());
//! while let Some(event) = device.read_event(ReadMode::Blocking).await? {
//!     println!("{event} -> axes {:?}", device.axis_values());
//! }
//! device.close()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod device;
pub mod sixaxis;

pub use device::{
    Capabilities, DeviceHandle, DeviceState, DriverVersion, EventKind, JoystickError, RawEvent,
    ReadMode,
};
pub use sixaxis::{SixAxis, SixAxisReading};
