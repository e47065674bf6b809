//! Error kinds for device access
//!
//! Every failure carries the device path so that callers juggling several
//! handles can tell them apart in logs. Read failures are fatal to the call
//! that produced them, never to the handle: callers may retry.

use std::io;

/// Errors raised by [`DeviceHandle`](super::DeviceHandle) and
/// [`SixAxis`](crate::sixaxis::SixAxis).
#[derive(Debug, thiserror::Error)]
pub enum JoystickError {
    /// The device file could not be opened (missing node, permissions, ...)
    #[error("Error opening {path}: {source}")]
    OpenError {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A capability ioctl failed
    #[error("{what} on {path}: {source}")]
    QueryError {
        path: String,
        what: &'static str,
        #[source]
        source: nix::Error,
    },

    /// JSIOCGVERSION failed
    #[error("version error on {path}: {source}")]
    VersionError {
        path: String,
        #[source]
        source: nix::Error,
    },

    /// The read syscall returned a negative result
    #[error("read error on {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A record did not have the fixed event size
    #[error("malformed event record: expected {expected} bytes, got {actual}")]
    DecodeError { expected: usize, actual: usize },

    /// A six-axis read returned zero bytes
    #[error("empty report from {path}")]
    EmptyReport { path: String },

    /// The event stream reached end-of-file; the device is gone
    #[error("end of stream on {path}")]
    EndOfStream { path: String },

    /// The handle was closed while this read was waiting for data
    #[error("read on {path} cancelled: device closed")]
    Cancelled { path: String },

    /// The handle has already been closed
    #[error("device {path} is closed")]
    Closed { path: String },

    /// Another read currently owns this handle
    #[error("a read is already in progress on {path}")]
    ReadInProgress { path: String },

    /// close(2) reported an error
    #[error("failed to close {path}: {source}")]
    CloseError {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The blocking-pool task running a read panicked or was aborted
    #[error("blocking read task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),
}

impl JoystickError {
    /// True for errors after which no further event will ever arrive on the handle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JoystickError::EndOfStream { .. }
                | JoystickError::Cancelled { .. }
                | JoystickError::Closed { .. }
        )
    }
}
