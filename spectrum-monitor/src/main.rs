use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;

use audio_spectrum_core::{CaptureSession, SpectrumConfiguration, SpectrumMailbox};
use audio_spectrum_cpal::{CpalInputCapture, DeviceEnumerator};

/// Log the live spectrum of an audio input device.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Input device name (default: the host's default input)
    #[arg(long)]
    device: Option<String>,

    /// Logarithmic scaling factor applied to every bar
    #[arg(long, default_value_t = 1.0)]
    sensitivity: f64,

    /// Number of bars (must evenly divide 512)
    #[arg(long, default_value_t = 64)]
    bars: usize,

    /// Stop after this many seconds (runs until killed if omitted)
    #[arg(long, value_parser = parse_seconds)]
    seconds: Option<f64>,

    /// How often the mailbox is polled
    #[arg(long, default_value_t = 250)]
    interval_ms: u64,

    /// List input devices and exit
    #[arg(long)]
    list_devices: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.list_devices {
        return list_devices();
    }

    let config = SpectrumConfiguration {
        bar_count: args.bars,
        sensitivity: args.sensitivity,
        ..Default::default()
    };

    let provider = match args.device {
        Some(ref name) => CpalInputCapture::with_device_name(name.clone()),
        None => CpalInputCapture::default_device(),
    };

    let mut session = CaptureSession::new(provider, config).context("invalid configuration")?;
    let mailbox = Arc::new(SpectrumMailbox::new(session.bar_count()));
    session.set_delegate(mailbox.clone());
    session.start().context("failed to start capture")?;

    let deadline = args
        .seconds
        .and_then(|s| Instant::now().checked_add(Duration::from_secs_f64(s)));
    let interval = Duration::from_millis(args.interval_ms.max(1));
    let mut last_sequence = 0;

    while deadline.map_or(true, |d| Instant::now() < d) {
        thread::sleep(interval);

        if let Some(error) = mailbox.take_error() {
            log::error!("Capture error: {}", error);
        }

        let Some(snapshot) = mailbox.take_latest() else {
            continue;
        };
        let skipped = snapshot.sequence.saturating_sub(last_sequence + 1);
        last_sequence = snapshot.sequence;

        if let Some((bar, value)) = snapshot.peak() {
            let (low, high) = session.config().bar_frequency_range(bar).unwrap_or_default();
            log::info!(
                "frame {:>6} peak bar {:>2} ({:>7.1}-{:>7.1} Hz) = {:.3} [{} skipped]",
                snapshot.sequence,
                bar,
                low,
                high,
                value,
                skipped
            );
        }
    }

    session.stop().context("failed to stop capture")?;
    let diagnostics = session.diagnostics();
    log::info!(
        "{} buffers, {} short, {} published",
        diagnostics.buffers_received,
        diagnostics.short_buffers,
        diagnostics.frames_published
    );
    Ok(())
}

fn parse_seconds(value: &str) -> std::result::Result<f64, String> {
    let seconds: f64 = value.parse().map_err(|e| format!("{}", e))?;
    Duration::try_from_secs_f64(seconds)
        .map(|_| seconds)
        .map_err(|_| format!("expected a finite, non-negative duration, got {}", value))
}

fn list_devices() -> Result<()> {
    let enumerator = DeviceEnumerator::new();
    let devices = enumerator
        .list_capture_devices()
        .context("failed to list input devices")?;

    println!("Host: {}", enumerator.host_name());
    for device in devices {
        let marker = if device.is_default { "*" } else { " " };
        println!("{} {}", marker, device.name);
    }
    Ok(())
}
