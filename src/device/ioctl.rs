//! joydev ioctl requests from `linux/joystick.h`.

use nix::{ioctl_read, ioctl_read_buf};

/// Size of the JSIOCGNAME buffer.
pub const NAME_LENGTH: usize = 128;

/// ABS_CNT: the axis map always has this many entries.
pub const AXIS_MAP_SIZE: usize = 0x40;

/// Value JSIOCGVERSION leaves behind when the driver does not fill it (0.8.0).
pub const DEFAULT_VERSION: u32 = 0x00_08_00;

ioctl_read!(jsiocgversion, b'j', 0x01, u32);
ioctl_read!(jsiocgaxes, b'j', 0x11, u8);
ioctl_read!(jsiocgbuttons, b'j', 0x12, u8);
ioctl_read_buf!(jsiocgname, b'j', 0x13, u8);
ioctl_read_buf!(jsiocgaxmap, b'j', 0x32, u8);
