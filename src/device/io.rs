//! Descriptor ownership and the raw read paths shared by joystick and six-axis handles.
//!
//! # Descriptor lifetime
//!
//! The open descriptor lives in an `Arc<OwnedFd>` inside a slot. Readers clone the
//! `Arc` for the duration of one read, so `close` only empties the slot and cancels
//! the handle's token: the OS-level close happens when the last clone is dropped.
//! A descriptor number can therefore never be recycled underneath a pending read.
//!
//! # Read serialization
//!
//! One read at a time per handle. Blocking reads queue on an owned async mutex whose
//! guard travels into the blocking-pool closure, so the lock is held until the
//! syscall really finished even if the awaiting future was dropped. Non-blocking
//! reads only `try_lock` and report [`JoystickError::ReadInProgress`] when busy; the
//! O_NONBLOCK toggle happens entirely while the guard is held.
//!
//! # Abandoned reads
//!
//! A blocking read parks what it read in the handle's pending slot before handing
//! the lock back. The awaiting caller claims it from there; if that caller went
//! away (timeout, losing `select!` arm) the next read on the handle returns it
//! instead of touching the descriptor.

use super::error::JoystickError;
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::fs::OpenOptions;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Upper bound on how long a blocking read waits before re-checking cancellation.
pub(crate) const POLL_SLICE: Duration = Duration::from_millis(50);

// Result of a single low-level read attempt
enum RawRead {
    Data(usize),
    WouldBlock,
    Cancelled,
}

#[derive(Debug)]
pub(crate) struct DeviceFile {
    path: PathBuf,
    slot: Mutex<Option<Arc<OwnedFd>>>,
    cancel: CancellationToken,
    read_lock: Arc<AsyncMutex<()>>,
    pending: Arc<Mutex<Option<Vec<u8>>>>,
}

impl DeviceFile {
    pub(crate) fn open(path: &Path) -> Result<Self, JoystickError> {
        let file = OpenOptions::new()
            .read(true)
            .open(path)
            .map_err(|source| JoystickError::OpenError {
                path: path.display().to_string(),
                source,
            })?;
        let fd = OwnedFd::from(file);
        info!("Opened {} (fd {})", path.display(), fd.as_raw_fd());

        Ok(Self {
            path: path.to_path_buf(),
            slot: Mutex::new(Some(Arc::new(fd))),
            cancel: CancellationToken::new(),
            read_lock: Arc::new(AsyncMutex::new(())),
            pending: Arc::new(Mutex::new(None)),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    pub(crate) fn is_open(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Clone of the live descriptor, or `Closed`.
    pub(crate) fn descriptor(&self) -> Result<Arc<OwnedFd>, JoystickError> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| JoystickError::Closed {
                path: self.display_path(),
            })
    }

    /// Closes the descriptor. A second call is a no-op.
    ///
    /// Any read waiting on this handle is cancelled. If such a read still holds the
    /// descriptor, the OS close is deferred until it lets go.
    pub(crate) fn close(&self) -> Result<(), JoystickError> {
        let taken = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(fd) = taken else {
            debug!("{} already closed, ignoring close", self.path.display());
            return Ok(());
        };

        self.cancel.cancel();

        match Arc::try_unwrap(fd) {
            Ok(owned) => {
                nix::unistd::close(owned).map_err(|errno| JoystickError::CloseError {
                    path: self.display_path(),
                    source: errno.into(),
                })?;
                info!("Closed {}", self.path.display());
            }
            Err(shared) => {
                debug!(
                    "Read in flight on {}, descriptor is released when it returns",
                    self.path.display()
                );
                drop(shared);
            }
        }
        Ok(())
    }

    /// Reads up to `N` bytes, suspending the calling task until data, EOF, an error
    /// or a close of this handle.
    ///
    /// Returns the buffer and the byte count; a count of zero is end-of-file. A
    /// record left behind by an abandoned read is returned first.
    pub(crate) async fn read_blocking<const N: usize>(
        &self,
    ) -> Result<([u8; N], usize), JoystickError> {
        let fd = self.descriptor()?;

        let guard = tokio::select! {
            guard = self.read_lock.clone().lock_owned() => guard,
            _ = self.cancel.cancelled() => return Err(self.cancelled()),
        };

        if let Some(read) = self.take_pending::<N>() {
            debug!("Returning record parked on {}", self.path.display());
            return Ok(read);
        }

        let cancel = self.cancel.clone();
        let pending = self.pending.clone();
        let (guard, outcome) = tokio::task::spawn_blocking(move || {
            let mut buf = [0u8; N];
            let outcome = read_cancellable(fd.as_fd(), &mut buf, &cancel);
            if let Ok(RawRead::Data(len)) = outcome {
                let mut parked = pending.lock().unwrap_or_else(PoisonError::into_inner);
                *parked = Some(buf[..len].to_vec());
            }
            (guard, outcome)
        })
        .await?;

        let claimed = match outcome {
            Ok(RawRead::Data(_)) => self.take_pending::<N>().ok_or_else(|| self.cancelled()),
            // read_cancellable keeps polling on EAGAIN, so this only reports cancellation
            Ok(RawRead::WouldBlock | RawRead::Cancelled) => Err(self.cancelled()),
            Err(errno) => Err(JoystickError::ReadError {
                path: self.display_path(),
                source: errno.into(),
            }),
        };
        drop(guard);
        claimed
    }

    /// One read with O_NONBLOCK set for exactly its duration.
    ///
    /// `None` when no data is pending; `Some((buf, 0))` is end-of-file.
    pub(crate) fn read_nonblocking<const N: usize>(
        &self,
    ) -> Result<Option<([u8; N], usize)>, JoystickError> {
        let fd = self.descriptor()?;

        let Ok(_guard) = self.read_lock.try_lock() else {
            return Err(JoystickError::ReadInProgress {
                path: self.display_path(),
            });
        };

        if let Some(read) = self.take_pending::<N>() {
            debug!("Returning record parked on {}", self.path.display());
            return Ok(Some(read));
        }

        let mut buf = [0u8; N];
        match read_with_nonblock_flag(fd.as_fd(), &mut buf) {
            Ok(RawRead::Data(len)) => Ok(Some((buf, len))),
            Ok(RawRead::WouldBlock | RawRead::Cancelled) => Ok(None),
            Err(errno) => Err(JoystickError::ReadError {
                path: self.display_path(),
                source: errno.into(),
            }),
        }
    }

    // Callers must hold the read lock
    fn take_pending<const N: usize>(&self) -> Option<([u8; N], usize)> {
        let record = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        let len = record.len().min(N);
        let mut buf = [0u8; N];
        buf[..len].copy_from_slice(&record[..len]);
        Some((buf, len))
    }

    fn cancelled(&self) -> JoystickError {
        JoystickError::Cancelled {
            path: self.display_path(),
        }
    }
}

impl Drop for DeviceFile {
    fn drop(&mut self) {
        // Wakes any orphaned blocking-pool read so it releases its descriptor clone
        self.cancel.cancel();
    }
}

fn read_once(fd: BorrowedFd<'_>, buf: &mut [u8]) -> nix::Result<RawRead> {
    match nix::unistd::read(fd, buf) {
        Ok(len) => Ok(RawRead::Data(len)),
        Err(Errno::EAGAIN) => Ok(RawRead::WouldBlock),
        Err(errno) => Err(errno),
    }
}

fn read_cancellable(
    fd: BorrowedFd<'_>,
    buf: &mut [u8],
    cancel: &CancellationToken,
) -> nix::Result<RawRead> {
    let timeout = PollTimeout::try_from(POLL_SLICE).unwrap_or(PollTimeout::MAX);

    loop {
        if cancel.is_cancelled() {
            return Ok(RawRead::Cancelled);
        }

        let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
        match poll(&mut fds, timeout) {
            Ok(0) | Err(Errno::EINTR) => continue,
            Ok(_) => {}
            Err(errno) => return Err(errno),
        }
        if cancel.is_cancelled() {
            return Ok(RawRead::Cancelled);
        }

        match read_once(fd, buf) {
            Ok(RawRead::WouldBlock) | Err(Errno::EINTR) => continue,
            other => return other,
        }
    }
}

fn read_with_nonblock_flag(fd: BorrowedFd<'_>, buf: &mut [u8]) -> nix::Result<RawRead> {
    let flags = file_flags(fd)?;
    set_file_flags(fd, flags | OFlag::O_NONBLOCK)?;

    let outcome = read_once(fd, buf);

    // Restore even when the read failed
    if let Err(errno) = set_file_flags(fd, flags) {
        warn!(
            "Failed to restore blocking mode on fd {}: {}",
            fd.as_raw_fd(),
            errno
        );
        return Err(errno);
    }
    outcome
}

pub(crate) fn file_flags(fd: BorrowedFd<'_>) -> nix::Result<OFlag> {
    fcntl(fd, FcntlArg::F_GETFL).map(OFlag::from_bits_retain)
}

fn set_file_flags(fd: BorrowedFd<'_>, flags: OFlag) -> nix::Result<()> {
    fcntl(fd, FcntlArg::F_SETFL(flags)).map(drop)
}
