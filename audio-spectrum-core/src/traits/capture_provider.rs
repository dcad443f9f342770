use std::sync::Arc;

use crate::models::audio_models::AudioSource;
use crate::models::config::SpectrumConfiguration;
use crate::models::error::CaptureError;

/// Callback invoked when a raw device buffer is available.
///
/// Parameters:
/// - `bytes`: Little-endian signed 16-bit mono PCM.
/// - `valid_bytes`: How many leading bytes of `bytes` hold captured audio.
pub type RawBufferCallback = Arc<dyn Fn(&[u8], usize) + Send + Sync + 'static>;

/// Callback invoked when the device reports an error after streaming started.
pub type StreamErrorCallback = Arc<dyn Fn(CaptureError) + Send + Sync + 'static>;

/// Interface for the audio input a session captures from.
///
/// Implemented by:
/// - `CpalInputCapture` (audio-spectrum-cpal)
pub trait CaptureProvider: Send + Sync {
    /// Whether the input device can currently be opened.
    fn is_available(&self) -> bool;

    /// Open the device at `format`, register the callbacks and begin streaming.
    ///
    /// Buffers are delivered on a device-driven thread; `on_buffer` has a
    /// real-time deadline of one buffer period.
    fn start(
        &mut self,
        format: &SpectrumConfiguration,
        on_buffer: RawBufferCallback,
        on_error: StreamErrorCallback,
    ) -> Result<(), CaptureError>;

    /// Stop streaming and release the device.
    ///
    /// After this returns the provider must not invoke either callback again.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Information about the device backing this provider.
    fn device_info(&self) -> AudioSource;
}
