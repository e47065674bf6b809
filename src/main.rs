use color_eyre::{eyre::eyre, Result};
use joystick::config::MonitorConfig;
use joystick::controller::xbox360::{self, LEFT_TRIGGER_AXIS, RIGHT_TRIGGER_AXIS};
use joystick::controller::MonitorHandle;
use joystick::{DeviceHandle, EventKind, ReadMode, SixAxis};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const USAGE: &str = "usage: joystick-monitor [--config FILE] <info|monitor|triggers|sixaxis> [DEVICE]";

enum Command {
    Info,
    Monitor,
    Triggers,
    SixAxis,
}

struct Args {
    command: Command,
    device: Option<PathBuf>,
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let args = parse_args(std::env::args().skip(1))?;
    let config = MonitorConfig::load_or_default(args.config.as_deref())?;
    debug!("Effective configuration: {:?}", config);

    match args.command {
        Command::Info => info_command(&config, args.device),
        Command::Monitor => monitor_command(&config, args.device).await,
        Command::Triggers => triggers_command(&config, args.device).await,
        Command::SixAxis => sixaxis_command(&config, args.device).await,
    }
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Args> {
    let mut config = None;
    let mut positional = Vec::new();

    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--config" => {
                let path = raw.next().ok_or_else(|| eyre!("--config needs a path\n{}", USAGE))?;
                config = Some(PathBuf::from(path));
            }
            "-h" | "--help" => return Err(eyre!(USAGE)),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let command = match positional.next().as_deref() {
        Some("info") => Command::Info,
        Some("monitor") => Command::Monitor,
        Some("triggers") => Command::Triggers,
        Some("sixaxis") => Command::SixAxis,
        Some(other) => return Err(eyre!("unknown command {:?}\n{}", other, USAGE)),
        None => return Err(eyre!(USAGE)),
    };

    Ok(Args {
        command,
        device: positional.next().map(PathBuf::from),
        config,
    })
}

fn info_command(config: &MonitorConfig, device: Option<PathBuf>) -> Result<()> {
    let path = device.unwrap_or_else(|| config.device_path.clone());
    let device = DeviceHandle::open(&path)?;

    let capabilities = device.capabilities()?;
    println!("{}", toml::to_string_pretty(&capabilities)?);
    println!("axis_map = {:?}", device.axis_map()?);

    device.close()?;
    Ok(())
}

async fn monitor_command(config: &MonitorConfig, device: Option<PathBuf>) -> Result<()> {
    let mut settings = config.monitor_settings();
    if let Some(path) = device {
        settings.device_path = path;
    }

    let (event_tx, mut event_rx) = mpsc::channel(1000);
    let monitor = MonitorHandle::spawn(Some(settings), event_tx)
        .map_err(|e| eyre!("Failed to spawn monitor: {}", e))?;

    let mut last_time = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping monitor");
                break;
            }
            event = event_rx.recv() => match event {
                Some(event) => {
                    // Blank line between bursts sharing a timestamp
                    if last_time.is_some_and(|t| t != event.time) {
                        println!();
                    }
                    println!("{}", xbox360::describe_event(&event));
                    last_time = Some(event.time);
                }
                None => break,
            },
        }
    }

    let stats = monitor.shutdown().await?;
    info!("Forwarded {} events, filtered {}", stats.forwarded, stats.filtered);
    Ok(())
}

async fn triggers_command(config: &MonitorConfig, device: Option<PathBuf>) -> Result<()> {
    let path = device.unwrap_or_else(|| config.device_path.clone());
    let device = DeviceHandle::open(&path)?;
    let mut last_left = None;
    let mut last_right = None;

    loop {
        let event = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = device.read_event(ReadMode::Blocking) => event,
        };
        let Some(event) = event? else { continue };
        if event.kind() != EventKind::Axis {
            continue;
        }

        let percent = xbox360::trigger_percent(event.value);
        let (label, last) = match event.number {
            LEFT_TRIGGER_AXIS => ("Left", &mut last_left),
            RIGHT_TRIGGER_AXIS => ("Right", &mut last_right),
            _ => continue,
        };
        if *last != Some(percent) {
            println!("{} trigger: {}%", label, percent);
            *last = Some(percent);
        }
    }

    device.close()?;
    Ok(())
}

async fn sixaxis_command(config: &MonitorConfig, device: Option<PathBuf>) -> Result<()> {
    let path = device.unwrap_or_else(|| config.sixaxis_path.clone());
    let sixaxis = SixAxis::open(&path)?;
    info!("Reading six-axis reports from {}", path.display());

    loop {
        let reading = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            reading = sixaxis.read() => reading?,
        };
        if reading.is_available() {
            println!("{}", reading);
        } else {
            warn!("Report layout not recognized");
        }
    }

    sixaxis.close()?;
    Ok(())
}
