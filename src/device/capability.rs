//! Capability queries issued through joydev ioctls.
//!
//! Counts and the axis map are strict: any ioctl failure is returned. The name,
//! the version and [`DeviceHandle::describe`] are deliberately lenient, matching
//! what joystick tools have always printed for odd devices: on failure they
//! substitute a documented default ([`UNKNOWN_NAME`], [`DriverVersion::default`])
//! and log the cause at warn level. Use [`DeviceHandle::try_name`] and
//! [`DeviceHandle::driver_version`] when the failure matters.

use super::error::JoystickError;
use super::handle::DeviceHandle;
use super::ioctl::{self, AXIS_MAP_SIZE, DEFAULT_VERSION, NAME_LENGTH};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::os::fd::AsRawFd;
use tracing::{debug, warn};

/// Name reported when JSIOCGNAME fails.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Driver version decoded from JSIOCGVERSION's packed `0xMMmmpp` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverVersion {
    pub major: u16,
    pub minor: u8,
    pub patch: u8,
}

impl From<u32> for DriverVersion {
    fn from(packed: u32) -> Self {
        Self {
            major: (packed >> 16) as u16,
            minor: ((packed >> 8) & 0xff) as u8,
            patch: (packed & 0xff) as u8,
        }
    }
}

impl Default for DriverVersion {
    /// 0.8.0, what the query yields when the driver leaves the value untouched
    fn default() -> Self {
        DEFAULT_VERSION.into()
    }
}

impl fmt::Display for DriverVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Everything the driver tells about a device, gathered in one go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub name: String,
    pub axes: u8,
    pub buttons: u8,
    pub version: DriverVersion,
}

impl DeviceHandle {
    pub fn axis_count(&self) -> Result<u8, JoystickError> {
        let fd = self.file.descriptor()?;
        let mut axes: u8 = 0;
        // SAFETY: JSIOCGAXES writes a single byte
        unsafe { ioctl::jsiocgaxes(fd.as_raw_fd(), &mut axes) }
            .map_err(|source| self.query_error("cannot retrieve axes", source))?;
        Ok(axes)
    }

    pub fn button_count(&self) -> Result<u8, JoystickError> {
        let fd = self.file.descriptor()?;
        let mut buttons: u8 = 0;
        // SAFETY: JSIOCGBUTTONS writes a single byte
        unsafe { ioctl::jsiocgbuttons(fd.as_raw_fd(), &mut buttons) }
            .map_err(|source| self.query_error("cannot retrieve buttons", source))?;
        Ok(buttons)
    }

    /// Device name as reported by the driver.
    pub fn try_name(&self) -> Result<String, JoystickError> {
        let fd = self.file.descriptor()?;
        let mut buf = [0u8; NAME_LENGTH];
        // SAFETY: the request size is derived from buf's length
        unsafe { ioctl::jsiocgname(fd.as_raw_fd(), &mut buf) }
            .map_err(|source| self.query_error("cannot retrieve name", source))?;

        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
    }

    /// Device name, or [`UNKNOWN_NAME`] when the query fails.
    pub fn name(&self) -> String {
        match self.try_name() {
            Ok(name) => name,
            Err(e) => {
                warn!("Falling back to \"{}\": {}", UNKNOWN_NAME, e);
                UNKNOWN_NAME.to_string()
            }
        }
    }

    pub fn driver_version(&self) -> Result<DriverVersion, JoystickError> {
        let fd = self.file.descriptor()?;
        let mut version: u32 = DEFAULT_VERSION;
        // SAFETY: JSIOCGVERSION writes a u32
        unsafe { ioctl::jsiocgversion(fd.as_raw_fd(), &mut version) }.map_err(|source| {
            JoystickError::VersionError {
                path: self.file.display_path(),
                source,
            }
        })?;
        Ok(version.into())
    }

    /// Physical axis code for each logical axis. Always [`AXIS_MAP_SIZE`] entries,
    /// whatever the device's actual axis count.
    pub fn axis_map(&self) -> Result<Vec<u8>, JoystickError> {
        let fd = self.file.descriptor()?;
        let mut map = [0u8; AXIS_MAP_SIZE];
        // SAFETY: the request size is derived from map's length
        unsafe { ioctl::jsiocgaxmap(fd.as_raw_fd(), &mut map) }
            .map_err(|source| self.query_error("cannot retrieve axis map", source))?;
        Ok(map.to_vec())
    }

    /// `"<name> <major.minor.patch>"`. Never fails: query errors are logged and
    /// replaced by the defaults.
    pub fn describe(&self) -> String {
        let version = self.driver_version().unwrap_or_else(|e| {
            warn!("Falling back to driver version {}: {}", DriverVersion::default(), e);
            DriverVersion::default()
        });
        format!("{} {}", self.name(), version)
    }

    /// Counts are required; name and version fall back like [`describe`](Self::describe).
    pub fn capabilities(&self) -> Result<Capabilities, JoystickError> {
        let capabilities = Capabilities {
            axes: self.axis_count()?,
            buttons: self.button_count()?,
            name: self.name(),
            version: self.driver_version().unwrap_or_default(),
        };
        debug!("{}: {:?}", self.path().display(), capabilities);
        Ok(capabilities)
    }

    fn query_error(&self, what: &'static str, source: nix::Error) -> JoystickError {
        JoystickError::QueryError {
            path: self.file.display_path(),
            what,
            source,
        }
    }
}
