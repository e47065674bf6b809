//! Front ends built on [`DeviceHandle`](crate::device::DeviceHandle)
//!
//! 1. [`monitor`] - Background event streaming with filtering and stats
//! 2. [`xbox360`] - Xbox 360 pad labels and drain helpers
//!
//! # Architecture
//!
//! ```text
//! js node ──► EventMonitor<Streaming> ──► mpsc::Receiver<RawEvent>
//!             (own tokio task)
//! ```

pub mod monitor;
pub mod xbox360;

pub use monitor::{EventMonitor, MonitorError, MonitorHandle, MonitorSettings, MonitorStats};
pub use xbox360::Xbox360Controller;
