use crate::device::{DeviceHandle, EventKind, JoystickError, RawEvent, ReadMode};
use chrono::Local;
use statum::{machine, state};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// Monitor settings
#[derive(Clone, Debug)]
pub struct MonitorSettings {
    pub device_path: PathBuf,
    pub read_mode: ReadMode,
    /// Pause between non-blocking reads that found nothing
    pub idle_sleep_ms: u64,
    /// Only forward events of this kind
    pub event_type: Option<EventKind>,
    /// Only forward events for this axis/button number
    pub event_number: Option<u8>,
    pub stats_interval_secs: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from("/dev/input/js0"),
            read_mode: ReadMode::Blocking,
            idle_sleep_ms: 10,
            event_type: None,
            event_number: None,
            stats_interval_secs: 10,
        }
    }
}

impl MonitorSettings {
    /// Stats window as a chrono duration; fails when it does not fit.
    pub fn stats_interval(&self) -> Result<chrono::Duration, MonitorError> {
        i64::try_from(self.stats_interval_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                MonitorError::InitializationError(format!(
                    "stats interval of {} seconds is out of range",
                    self.stats_interval_secs
                ))
            })
    }
}

// Monitor errors
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Device error: {0}")]
    DeviceError(#[from] JoystickError),

    #[error("Failed to initialize monitor: {0}")]
    InitializationError(String),

    #[error("Failed to send event: {0}")]
    EventSendError(String),

    #[error("Monitor task failed: {0}")]
    TaskError(String),
}

/// Counters reported when the monitor stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub forwarded: u64,
    pub filtered: u64,
}

#[state]
#[derive(Debug, Clone)]
pub enum MonitorState {
    Opening,
    Streaming,
}

#[machine]
#[derive(Debug)]
pub struct EventMonitor<S: MonitorState> {
    settings: MonitorSettings,

    // Set by initialize()
    device: Option<DeviceHandle>,

    event_sender: mpsc::Sender<RawEvent>,

    cancel: CancellationToken,
}

// Available in every state
impl<S: MonitorState> EventMonitor<S> {
    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Applies the type and number filters.
    pub fn accepts(&self, event: &RawEvent) -> bool {
        self.settings
            .event_type
            .map_or(true, |kind| event.kind() == kind)
            && self
                .settings
                .event_number
                .map_or(true, |number| event.number == number)
    }
}

impl EventMonitor<Opening> {
    pub fn create(
        settings: Option<MonitorSettings>,
        event_sender: mpsc::Sender<RawEvent>,
        cancel: CancellationToken,
    ) -> Self {
        let settings = settings.unwrap_or_default();
        debug!("Creating Event Monitor with settings: {:?}", settings);
        Self::new(settings, None, event_sender, cancel)
    }

    // Open the device and transition to Streaming
    pub fn initialize(mut self) -> Result<EventMonitor<Streaming>, MonitorError> {
        self.settings.stats_interval()?;
        info!("Opening {}", self.settings.device_path.display());
        let device = DeviceHandle::open(&self.settings.device_path)?;

        match device.capabilities() {
            Ok(caps) => info!(
                "{} ({}): {} axes, {} buttons, driver {}",
                caps.name,
                device.path().display(),
                caps.axes,
                caps.buttons,
                caps.version
            ),
            Err(e) => warn!("Capabilities unavailable, streaming anyway: {}", e),
        }

        self.device = Some(device);
        info!("Event Monitor initialized, transitioning to Streaming state");
        Ok(self.transition())
    }
}

impl EventMonitor<Streaming> {
    pub fn device(&self) -> Result<&DeviceHandle, MonitorError> {
        self.device
            .as_ref()
            .ok_or_else(|| MonitorError::InitializationError("device not open".to_string()))
    }

    /// Streams until cancelled, the device goes away, or the receiver is dropped.
    /// The device is closed on every exit path.
    pub async fn run_streaming_loop(mut self) -> Result<MonitorStats, MonitorError> {
        info!("Starting Event Monitor loop");
        let result = self.stream().await;

        if let Some(device) = self.device.take() {
            if let Err(e) = device.close() {
                warn!("Failed to close {}: {}", device.path().display(), e);
            }
        }

        match &result {
            Ok(stats) => info!(
                "Event Monitor stopped: {} forwarded, {} filtered",
                stats.forwarded, stats.filtered
            ),
            Err(e) => error!("Event Monitor terminated with error: {}", e),
        }
        result
    }

    async fn stream(&self) -> Result<MonitorStats, MonitorError> {
        let device = self.device()?;
        let idle = Duration::from_millis(self.settings.idle_sleep_ms);
        let mut stats = MonitorStats::default();

        // For periodic stats
        let mut window_count = 0u64;
        let mut last_log_time = Local::now();
        let log_interval = self.settings.stats_interval()?;

        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Event Monitor cancelled");
                    return Ok(stats);
                }
                next = device.read_event(self.settings.read_mode) => next,
            };

            match next {
                Ok(Some(event)) => {
                    if self.accepts(&event) {
                        self.event_sender
                            .send(event)
                            .await
                            .map_err(|e| MonitorError::EventSendError(e.to_string()))?;
                        stats.forwarded += 1;
                        window_count += 1;
                    } else {
                        debug!("Filtered out {}", event);
                        stats.filtered += 1;
                    }
                }
                Ok(None) => tokio::time::sleep(idle).await,
                Err(e) if e.is_terminal() => {
                    warn!("Event stream ended: {}", e);
                    return Ok(stats);
                }
                Err(e) => {
                    // Read failures are not fatal to the handle, keep going
                    error!("Error reading event: {}", e);
                    tokio::time::sleep(idle).await;
                }
            }

            let now = Local::now();
            if now - last_log_time > log_interval {
                info!(
                    "Event Monitor stats: forwarded {} events in last {} seconds (avg {:.2}/sec)",
                    window_count,
                    log_interval.num_seconds(),
                    window_count as f64 / log_interval.num_seconds().max(1) as f64
                );
                window_count = 0;
                last_log_time = now;
            }
        }
    }
}

/// Runs an [`EventMonitor`] on its own tokio task.
pub struct MonitorHandle {
    cancel: CancellationToken,
    task: JoinHandle<Result<MonitorStats, MonitorError>>,
}

impl MonitorHandle {
    /// Opens the device right away, so open failures surface here rather than
    /// inside the task.
    pub fn spawn(
        settings: Option<MonitorSettings>,
        event_sender: mpsc::Sender<RawEvent>,
    ) -> Result<Self, MonitorError> {
        info!("Spawning Event Monitor with settings: {:?}", settings);
        let cancel = CancellationToken::new();

        let streaming = EventMonitor::create(settings, event_sender, cancel.clone()).initialize()?;
        let task = tokio::spawn(streaming.run_streaming_loop());

        info!("Event Monitor successfully started");
        Ok(Self { cancel, task })
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the monitor and waits for it to close the device.
    pub async fn shutdown(self) -> Result<MonitorStats, MonitorError> {
        self.cancel.cancel();
        self.wait().await
    }

    /// Waits for the monitor to stop on its own (end of stream, receiver dropped).
    pub async fn wait(self) -> Result<MonitorStats, MonitorError> {
        self.task
            .await
            .map_err(|e| MonitorError::TaskError(e.to_string()))?
    }
}
