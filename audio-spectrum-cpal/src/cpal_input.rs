//! cpal input capture provider.
//!
//! Opens a mono input stream on the default (or a named) input device and
//! delivers little-endian signed 16-bit PCM via the `RawBufferCallback`.

use std::sync::mpsc;
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;

use audio_spectrum_core::models::audio_models::AudioSource;
use audio_spectrum_core::models::config::SpectrumConfiguration;
use audio_spectrum_core::models::error::CaptureError;
use audio_spectrum_core::traits::capture_provider::{
    CaptureProvider, RawBufferCallback, StreamErrorCallback,
};

/// Handle to the thread that owns the live `cpal::Stream`.
struct RunningStream {
    stop_tx: mpsc::Sender<()>,
    handle: thread::JoinHandle<()>,
}

/// cpal input capture.
///
/// `cpal::Stream` is not `Send` on every host, so the stream is built, played
/// and dropped on a dedicated `cpal-input` thread. `start` blocks until that
/// thread reports whether the device opened; `stop` signals it and joins,
/// which drops the stream and guarantees no further callbacks.
pub struct CpalInputCapture {
    device_name: Option<String>,
    running: Mutex<Option<RunningStream>>,
}

impl CpalInputCapture {
    /// Capture from the host's default input device.
    pub fn default_device() -> Self {
        Self {
            device_name: None,
            running: Mutex::new(None),
        }
    }

    /// Capture from the input device whose cpal name equals `name`.
    pub fn with_device_name(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
            running: Mutex::new(None),
        }
    }
}

impl CaptureProvider for CpalInputCapture {
    fn is_available(&self) -> bool {
        find_input_device(&cpal::default_host(), self.device_name.as_deref()).is_ok()
    }

    fn start(
        &mut self,
        format: &SpectrumConfiguration,
        on_buffer: RawBufferCallback,
        on_error: StreamErrorCallback,
    ) -> Result<(), CaptureError> {
        if self.running.lock().is_some() {
            return Err(CaptureError::StreamFailed(
                "input capture already running".into(),
            ));
        }

        let device_name = self.device_name.clone();
        let config = format.clone();
        let (ready_tx, ready_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("cpal-input".into())
            .spawn(move || {
                let stream = match open_stream(device_name.as_deref(), &config, on_buffer, on_error) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                // Park until stop() signals (or the sender is dropped).
                let _ = stop_rx.recv();
                drop(stream);
            })
            .map_err(|e| CaptureError::StreamFailed(format!("failed to spawn input thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                *self.running.lock() = Some(RunningStream { stop_tx, handle });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CaptureError::StreamFailed(
                    "input thread exited before opening the device".into(),
                ))
            }
        }
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        let Some(running) = self.running.lock().take() else {
            return Ok(());
        };
        let _ = running.stop_tx.send(());
        running
            .handle
            .join()
            .map_err(|_| CaptureError::StreamFailed("input thread panicked".into()))
    }

    fn device_info(&self) -> AudioSource {
        AudioSource {
            id: self
                .device_name
                .clone()
                .unwrap_or_else(|| "default-input".into()),
            name: self
                .device_name
                .clone()
                .unwrap_or_else(|| "Default Input".into()),
            is_default: self.device_name.is_none(),
        }
    }
}

impl Drop for CpalInputCapture {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("Error while releasing input device: {}", e);
        }
    }
}

pub(crate) fn find_input_device(
    host: &cpal::Host,
    name: Option<&str>,
) -> Result<cpal::Device, CaptureError> {
    match name {
        None => host
            .default_input_device()
            .ok_or(CaptureError::DeviceUnavailable),
        Some(wanted) => host
            .input_devices()
            .map_err(|e| CaptureError::StreamFailed(format!("failed to list input devices: {}", e)))?
            .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
            .ok_or(CaptureError::DeviceUnavailable),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SampleKind {
    I16,
    F32,
}

/// Build and play the stream on the calling thread.
///
/// Tries the exact format first (i16, fixed buffer of `buffer_samples`), then
/// falls back to the host's default buffer size and to f32 capture converted
/// to i16. Off-size buffers are absorbed by the pipeline's zero-padding.
fn open_stream(
    device_name: Option<&str>,
    config: &SpectrumConfiguration,
    on_buffer: RawBufferCallback,
    on_error: StreamErrorCallback,
) -> Result<cpal::Stream, CaptureError> {
    let host = cpal::default_host();
    let device = find_input_device(&host, device_name)?;
    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());

    let attempts = [
        (SampleKind::I16, cpal::BufferSize::Fixed(config.buffer_samples as u32)),
        (SampleKind::I16, cpal::BufferSize::Default),
        (SampleKind::F32, cpal::BufferSize::Fixed(config.buffer_samples as u32)),
        (SampleKind::F32, cpal::BufferSize::Default),
    ];

    let mut first_error = None;
    for (kind, buffer_size) in attempts {
        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size,
        };

        let built = build_stream(
            &device,
            &stream_config,
            kind,
            config.buffer_bytes(),
            on_buffer.clone(),
            on_error.clone(),
        );

        match built {
            Ok(stream) => {
                stream.play().map_err(map_play_error)?;
                if first_error.is_some() {
                    log::warn!(
                        "{}: exact format rejected, capturing {:?} with {:?}",
                        name,
                        kind,
                        buffer_size
                    );
                }
                log::info!(
                    "Audio input: {} @ {}Hz, {} samples/buffer",
                    name,
                    config.sample_rate,
                    config.buffer_samples
                );
                return Ok(stream);
            }
            // Only format problems are worth retrying with another shape.
            Err(e @ CaptureError::FormatUnsupported(_)) => {
                log::debug!("{}: {:?} / {:?} rejected: {}", name, kind, buffer_size, e);
                first_error.get_or_insert(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(first_error.unwrap_or_else(|| CaptureError::FormatUnsupported(name)))
}

fn build_stream(
    device: &cpal::Device,
    stream_config: &cpal::StreamConfig,
    kind: SampleKind,
    capacity_bytes: usize,
    on_buffer: RawBufferCallback,
    on_error: StreamErrorCallback,
) -> Result<cpal::Stream, CaptureError> {
    // Reused for every callback; only grows if the host delivers more than asked.
    let mut bytes: Vec<u8> = Vec::with_capacity(capacity_bytes);
    let err_fn = move |err: cpal::StreamError| on_error(map_stream_error(err));

    let stream = match kind {
        SampleKind::I16 => device.build_input_stream(
            stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                encode_i16_le(data, &mut bytes);
                on_buffer(&bytes, bytes.len());
            },
            err_fn,
            None,
        ),
        SampleKind::F32 => device.build_input_stream(
            stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                encode_f32_as_i16_le(data, &mut bytes);
                on_buffer(&bytes, bytes.len());
            },
            err_fn,
            None,
        ),
    };

    stream.map_err(map_build_error)
}

/// Serialize `i16` samples as little-endian bytes into `out` (cleared first).
pub(crate) fn encode_i16_le(data: &[i16], out: &mut Vec<u8>) {
    out.clear();
    for sample in data {
        out.extend_from_slice(&sample.to_le_bytes());
    }
}

/// Quantize `[-1.0, 1.0]` floats to little-endian `i16` bytes (cleared first).
///
/// Out-of-range values are clamped.
pub(crate) fn encode_f32_as_i16_le(data: &[f32], out: &mut Vec<u8>) {
    out.clear();
    for &sample in data {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        out.extend_from_slice(&value.to_le_bytes());
    }
}

/// Hosts report access problems only as backend-specific text.
fn looks_like_permission_problem(description: &str) -> bool {
    let lower = description.to_lowercase();
    lower.contains("permission") || lower.contains("access denied") || lower.contains("not permitted")
}

fn map_backend_error(description: String) -> CaptureError {
    if looks_like_permission_problem(&description) {
        CaptureError::PermissionDenied
    } else {
        CaptureError::StreamFailed(description)
    }
}

pub(crate) fn map_build_error(err: cpal::BuildStreamError) -> CaptureError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => CaptureError::DeviceUnavailable,
        cpal::BuildStreamError::StreamConfigNotSupported => {
            CaptureError::FormatUnsupported("stream configuration not supported".into())
        }
        cpal::BuildStreamError::InvalidArgument => {
            CaptureError::FormatUnsupported("invalid stream argument".into())
        }
        cpal::BuildStreamError::BackendSpecific { err } => map_backend_error(err.description),
        other => CaptureError::StreamFailed(other.to_string()),
    }
}

pub(crate) fn map_play_error(err: cpal::PlayStreamError) -> CaptureError {
    match err {
        cpal::PlayStreamError::DeviceNotAvailable => CaptureError::DeviceUnavailable,
        cpal::PlayStreamError::BackendSpecific { err } => map_backend_error(err.description),
    }
}

pub(crate) fn map_stream_error(err: cpal::StreamError) -> CaptureError {
    match err {
        cpal::StreamError::DeviceNotAvailable => CaptureError::DeviceUnavailable,
        cpal::StreamError::BackendSpecific { err } => map_backend_error(err.description),
    }
}
