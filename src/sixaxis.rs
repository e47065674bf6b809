//! Six-axis accelerometer reports
//!
//! A six-axis controller exposes its raw HID reports on a separate node (usually
//! a hidraw device). Only two report lengths are understood; both carry the three
//! accelerometer axes as big-endian 16-bit values, the 49-byte variant shifted by
//! a one-byte report-ID prefix.

use crate::device::error::JoystickError;
use crate::device::io::DeviceFile;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Largest report read in one go.
pub const REPORT_SIZE: usize = 128;

/// `(report length, offset of x)`; y and z follow at +2 and +4.
const REPORT_LAYOUTS: [(usize, usize); 2] = [(48, 40), (49, 41)];

/// Accelerometer sample; an axis is `None` when the report layout was not recognized.
///
/// Each axis is the report's big-endian 16-bit word taken as signed. Tools that
/// print the same word unsigned (0..=65535) show `value as u16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SixAxisReading {
    pub x: Option<i16>,
    pub y: Option<i16>,
    pub z: Option<i16>,
}

impl SixAxisReading {
    pub fn from_report(report: &[u8]) -> Self {
        let Some(&(_, offset)) = REPORT_LAYOUTS.iter().find(|(len, _)| *len == report.len())
        else {
            return Self::default();
        };

        let axis = |at: usize| Some(i16::from_be_bytes([report[at], report[at + 1]]));
        Self {
            x: axis(offset),
            y: axis(offset + 2),
            z: axis(offset + 4),
        }
    }

    pub fn is_available(&self) -> bool {
        self.x.is_some() && self.y.is_some() && self.z.is_some()
    }
}

impl fmt::Display for SixAxisReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<i16>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
        write!(f, "x={} y={} z={}", show(self.x), show(self.y), show(self.z))
    }
}

/// Open six-axis report node. Independent from any [`DeviceHandle`](crate::DeviceHandle).
#[derive(Debug)]
pub struct SixAxis {
    file: DeviceFile,
}

impl SixAxis {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JoystickError> {
        Ok(Self {
            file: DeviceFile::open(path.as_ref())?,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Waits for the next report and extracts the accelerometer axes.
    ///
    /// A zero-length read fails with [`JoystickError::EmptyReport`].
    pub async fn read(&self) -> Result<SixAxisReading, JoystickError> {
        let (report, len) = self.file.read_blocking::<REPORT_SIZE>().await?;
        if len == 0 {
            return Err(JoystickError::EmptyReport {
                path: self.file.display_path(),
            });
        }

        let reading = SixAxisReading::from_report(&report[..len]);
        debug!("{}: {} byte report, {}", self.path().display(), len, reading);
        Ok(reading)
    }

    /// Closes the node; a second call is a no-op.
    pub fn close(&self) -> Result<(), JoystickError> {
        self.file.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const AXES: [u8; 6] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];

    fn report(len: usize, offset: usize) -> Vec<u8> {
        let mut report = vec![0xAA; len];
        report[offset..offset + 6].copy_from_slice(&AXES);
        report
    }

    fn expected() -> SixAxisReading {
        SixAxisReading {
            x: Some(0x0102),
            y: Some(0x0304),
            z: Some(0x0506),
        }
    }

    #[test]
    fn plain_report_reads_from_offset_40() {
        assert_eq!(SixAxisReading::from_report(&report(48, 40)), expected());
    }

    #[test]
    fn prefixed_report_reads_from_offset_41() {
        assert_eq!(SixAxisReading::from_report(&report(49, 41)), expected());
    }

    #[test]
    fn values_are_signed_big_endian() {
        let mut raw = vec![0u8; 48];
        raw[40..46].copy_from_slice(&[0xFF, 0xFE, 0x80, 0x00, 0x7F, 0xFF]);
        let reading = SixAxisReading::from_report(&raw);
        assert_eq!(reading.x, Some(-2));
        assert_eq!(reading.y, Some(i16::MIN));
        assert_eq!(reading.z, Some(i16::MAX));
        assert_eq!(reading.x.map(|v| v as u16), Some(0xFFFE));
    }

    #[test]
    fn other_lengths_are_unavailable() {
        for len in [0, 1, 46, 47, 50, 64, 128] {
            let reading = SixAxisReading::from_report(&vec![0x11; len]);
            assert!(!reading.is_available(), "length {len}");
            assert_eq!(reading, SixAxisReading::default());
        }
        assert_eq!(SixAxisReading::default().to_string(), "x=- y=- z=-");
    }

    #[tokio::test]
    async fn reads_a_report_from_the_node() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hidraw0");
        std::fs::write(&path, report(49, 41)).unwrap();

        let sixaxis = SixAxis::open(&path).unwrap();
        assert_eq!(sixaxis.read().await.unwrap(), expected());

        let err = sixaxis.read().await.unwrap_err();
        assert!(matches!(err, JoystickError::EmptyReport { .. }));

        sixaxis.close().unwrap();
        sixaxis.close().unwrap();
        assert!(matches!(
            sixaxis.read().await,
            Err(JoystickError::Closed { .. })
        ));
    }

    #[test]
    fn open_error_names_the_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing");
        let err = SixAxis::open(&path).unwrap_err();
        assert!(err
            .to_string()
            .starts_with(&format!("Error opening {}", path.display())));
    }
}
