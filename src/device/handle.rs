use super::error::JoystickError;
use super::event::{RawEvent, EVENT_SIZE};
use super::io::DeviceFile;
use super::state::DeviceState;
use std::path::Path;
use tokio::sync::watch;
use tracing::debug;

/// How [`DeviceHandle::read_event`] waits for data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Suspend the calling task until a record arrives
    #[default]
    Blocking,
    /// Return `None` right away when nothing is pending
    NonBlocking,
}

impl ReadMode {
    pub fn from_non_blocking(non_blocking: bool) -> Self {
        if non_blocking {
            ReadMode::NonBlocking
        } else {
            ReadMode::Blocking
        }
    }
}

/// An open joydev node (e.g. `/dev/input/js0`) plus its [`DeviceState`].
///
/// The descriptor is released by [`close`](Self::close) or when the handle is
/// dropped, whichever comes first. Every operation except `close` fails with
/// [`JoystickError::Closed`] afterwards.
#[derive(Debug)]
pub struct DeviceHandle {
    pub(crate) file: DeviceFile,
    state: watch::Sender<DeviceState>,
}

impl DeviceHandle {
    /// Opens `path` read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JoystickError> {
        let file = DeviceFile::open(path.as_ref())?;
        let (state, _) = watch::channel(DeviceState::default());
        Ok(Self { file, state })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn is_open(&self) -> bool {
        self.file.is_open()
    }

    /// Closes the device. Calling it again is a no-op.
    ///
    /// A read waiting on this handle fails with [`JoystickError::Cancelled`].
    pub fn close(&self) -> Result<(), JoystickError> {
        self.file.close()
    }

    /// Reads and decodes one event, updating the device state on success.
    ///
    /// In [`ReadMode::NonBlocking`] `Ok(None)` means no event was pending. A read
    /// that hits end-of-file fails with [`JoystickError::EndOfStream`]: the joydev
    /// driver only does that once the device is gone.
    ///
    /// Blocking reads wait their turn behind other blocking reads on the same
    /// handle; a non-blocking read that finds one in flight fails with
    /// [`JoystickError::ReadInProgress`].
    ///
    /// Dropping a blocking read before it completes does not lose the event: the
    /// next read on the handle returns it.
    pub async fn read_event(&self, mode: ReadMode) -> Result<Option<RawEvent>, JoystickError> {
        let (record, len) = match mode {
            ReadMode::Blocking => self.file.read_blocking::<EVENT_SIZE>().await?,
            ReadMode::NonBlocking => match self.file.read_nonblocking::<EVENT_SIZE>()? {
                Some(read) => read,
                None => return Ok(None),
            },
        };

        if len == 0 {
            return Err(JoystickError::EndOfStream {
                path: self.file.display_path(),
            });
        }

        let event = RawEvent::decode(&record[..len])?;
        debug!("{}: {}", self.path().display(), event);

        self.state.send_if_modified(|state| state.apply(&event));
        Ok(Some(event))
    }

    /// Snapshot of the latest axis and button values.
    pub fn state(&self) -> DeviceState {
        self.state.borrow().clone()
    }

    pub fn axis_values(&self) -> Vec<i16> {
        self.state.borrow().axis_values().to_vec()
    }

    pub fn button_values(&self) -> Vec<i16> {
        self.state.borrow().button_values().to_vec()
    }

    /// Receiver notified whenever a read changes the state.
    pub fn subscribe(&self) -> watch::Receiver<DeviceState> {
        debug!("New subscriber to {} state", self.path().display());
        self.state.subscribe()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::device::event::{JS_EVENT_AXIS, JS_EVENT_BUTTON, JS_EVENT_INIT};
    use crate::device::io::file_flags;
    use nix::fcntl::OFlag;
    use nix::sys::stat::Mode;
    use std::fs::{File, OpenOptions};
    use std::io::Write;
    use std::os::fd::AsFd;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    pub(crate) fn event(type_tag: u8, number: u8, value: i16, time: u32) -> RawEvent {
        RawEvent {
            time,
            value,
            type_tag,
            number,
        }
    }

    /// Regular file holding `events` back to back, ending in EOF.
    pub(crate) fn recorded_device(dir: &TempDir, events: &[RawEvent]) -> PathBuf {
        let path = dir.path().join("js-recorded");
        let mut file = File::create(&path).unwrap();
        for event in events {
            file.write_all(&event.to_record()).unwrap();
        }
        path
    }

    /// FIFO standing in for a live device. The returned writer keeps it open so
    /// reads see "no data yet" instead of EOF.
    pub(crate) fn live_device(dir: &TempDir) -> (PathBuf, File) {
        let path = dir.path().join("js-live");
        nix::unistd::mkfifo(&path, Mode::S_IRUSR | Mode::S_IWUSR).unwrap();
        // O_RDWR so opening does not wait for a reader
        let writer = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .unwrap();
        (path, writer)
    }

    #[tokio::test]
    async fn blocking_reads_follow_the_record_stream() {
        let dir = TempDir::new().unwrap();
        let path = recorded_device(
            &dir,
            &[
                event(JS_EVENT_AXIS | JS_EVENT_INIT, 0, 0, 0),
                event(JS_EVENT_BUTTON, 1, 1, 10),
                event(JS_EVENT_AXIS, 0, -1200, 20),
            ],
        );
        let device = DeviceHandle::open(&path).unwrap();

        let first = device.read_event(ReadMode::Blocking).await.unwrap().unwrap();
        assert!(first.is_init());

        let second = device.read_event(ReadMode::Blocking).await.unwrap().unwrap();
        assert_eq!(second.number, 1);
        assert_eq!(device.button_values(), vec![0, 1]);
        assert_eq!(device.axis_values(), vec![0]);

        device.read_event(ReadMode::Blocking).await.unwrap();
        assert_eq!(device.axis_values(), vec![-1200]);
        assert_eq!(device.button_values(), vec![0, 1]);

        let end = device.read_event(ReadMode::Blocking).await.unwrap_err();
        assert!(matches!(end, JoystickError::EndOfStream { .. }));
        assert!(end.is_terminal());
    }

    #[tokio::test]
    async fn unknown_type_is_returned_without_touching_state() {
        let dir = TempDir::new().unwrap();
        let path = recorded_device(
            &dir,
            &[event(JS_EVENT_AXIS, 2, 40, 0), event(0x04, 2, 99, 5)],
        );
        let device = DeviceHandle::open(&path).unwrap();
        device.read_event(ReadMode::Blocking).await.unwrap();
        let before = device.state();

        let unknown = device.read_event(ReadMode::Blocking).await.unwrap().unwrap();
        assert_eq!(unknown.kind().raw(), 0x04);
        assert_eq!(device.state(), before);
    }

    #[tokio::test]
    async fn truncated_record_is_a_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("js-short");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();
        let device = DeviceHandle::open(&path).unwrap();

        let err = device.read_event(ReadMode::Blocking).await.unwrap_err();
        assert!(matches!(err, JoystickError::DecodeError { actual: 3, .. }));
        assert!(device.state().axis_values().is_empty());
    }

    #[tokio::test]
    async fn non_blocking_read_without_data_returns_none_and_restores_flags() {
        let dir = TempDir::new().unwrap();
        let (path, _writer) = live_device(&dir);
        let device = DeviceHandle::open(&path).unwrap();
        let fd = device.file.descriptor().unwrap();
        let flags_before = file_flags(fd.as_fd()).unwrap();

        let read = device.read_event(ReadMode::NonBlocking).await.unwrap();

        assert!(read.is_none());
        let flags_after = file_flags(fd.as_fd()).unwrap();
        assert_eq!(flags_after, flags_before);
        assert!(!flags_after.contains(OFlag::O_NONBLOCK));
    }

    #[tokio::test]
    async fn non_blocking_read_picks_up_pending_event() {
        let dir = TempDir::new().unwrap();
        let (path, mut writer) = live_device(&dir);
        let device = DeviceHandle::open(&path).unwrap();
        writer
            .write_all(&event(JS_EVENT_BUTTON, 4, 1, 77).to_record())
            .unwrap();

        let read = device.read_event(ReadMode::NonBlocking).await.unwrap();

        assert_eq!(read.map(|e| e.time), Some(77));
        assert_eq!(device.state().button(4), Some(1));
        assert!(device
            .read_event(ReadMode::NonBlocking)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn blocking_read_waits_for_a_writer() {
        let dir = TempDir::new().unwrap();
        let (path, mut writer) = live_device(&dir);
        let device = Arc::new(DeviceHandle::open(&path).unwrap());
        let mut updates = device.subscribe();

        let reader = {
            let device = device.clone();
            tokio::spawn(async move { device.read_event(ReadMode::Blocking).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!reader.is_finished());

        writer
            .write_all(&event(JS_EVENT_AXIS, 1, 321, 5).to_record())
            .unwrap();

        let read = reader.await.unwrap().unwrap().unwrap();
        assert_eq!(read.value, 321);
        updates.changed().await.unwrap();
        assert_eq!(updates.borrow().axis(1), Some(321));
    }

    #[tokio::test]
    async fn timed_out_blocking_read_hands_its_event_to_the_next_read() {
        let dir = TempDir::new().unwrap();
        let (path, mut writer) = live_device(&dir);
        let device = DeviceHandle::open(&path).unwrap();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            device.read_event(ReadMode::Blocking),
        )
        .await;
        assert!(abandoned.is_err());

        writer
            .write_all(&event(JS_EVENT_BUTTON, 3, 1, 30).to_record())
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let next = device.read_event(ReadMode::NonBlocking).await.unwrap();
        assert_eq!(next.map(|e| (e.number, e.value)), Some((3, 1)));
        assert_eq!(device.state().button(3), Some(1));

        // Same again, this time claimed by a blocking read
        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            device.read_event(ReadMode::Blocking),
        )
        .await;
        assert!(abandoned.is_err());

        writer
            .write_all(&event(JS_EVENT_AXIS, 0, -700, 40).to_record())
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let next = device.read_event(ReadMode::Blocking).await.unwrap().unwrap();
        assert_eq!(next.time, 40);
        assert_eq!(device.axis_values(), vec![-700]);
        assert!(device
            .read_event(ReadMode::NonBlocking)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn close_cancels_a_pending_blocking_read() {
        let dir = TempDir::new().unwrap();
        let (path, _writer) = live_device(&dir);
        let device = Arc::new(DeviceHandle::open(&path).unwrap());

        let reader = {
            let device = device.clone();
            tokio::spawn(async move { device.read_event(ReadMode::Blocking).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        device.close().unwrap();

        let result = tokio::time::timeout(Duration::from_secs(2), reader)
            .await
            .expect("read did not observe close")
            .unwrap();
        assert!(matches!(result, Err(JoystickError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn non_blocking_read_fails_fast_while_a_blocking_read_is_pending() {
        let dir = TempDir::new().unwrap();
        let (path, mut writer) = live_device(&dir);
        let device = Arc::new(DeviceHandle::open(&path).unwrap());

        let reader = {
            let device = device.clone();
            tokio::spawn(async move { device.read_event(ReadMode::Blocking).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        let busy = device.read_event(ReadMode::NonBlocking).await.unwrap_err();
        assert!(matches!(busy, JoystickError::ReadInProgress { .. }));

        writer
            .write_all(&event(JS_EVENT_BUTTON, 0, 1, 1).to_record())
            .unwrap();
        assert!(reader.await.unwrap().unwrap().is_some());
    }

    #[tokio::test]
    async fn closing_twice_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let path = recorded_device(&dir, &[]);
        let device = DeviceHandle::open(&path).unwrap();

        device.close().unwrap();
        device.close().unwrap();
        assert!(!device.is_open());

        let err = device.read_event(ReadMode::Blocking).await.unwrap_err();
        assert!(matches!(err, JoystickError::Closed { .. }));
    }

    #[test]
    fn opening_a_missing_node_is_an_open_error() {
        let dir = TempDir::new().unwrap();
        let err = DeviceHandle::open(dir.path().join("js9")).unwrap_err();
        assert!(matches!(err, JoystickError::OpenError { .. }));
        assert!(err.to_string().starts_with("Error opening "));
    }

    #[test]
    fn many_handles_open_at_once() {
        let dir = TempDir::new().unwrap();
        let path = recorded_device(&dir, &[]);
        let handles: Vec<_> = (0..64).map(|_| DeviceHandle::open(&path).unwrap()).collect();
        assert!(handles.iter().all(DeviceHandle::is_open));
    }
}
