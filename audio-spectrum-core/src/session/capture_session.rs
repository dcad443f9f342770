use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::dispatcher::{NotificationDispatcher, Notifier};
use crate::models::audio_models::{AudioSource, SpectrumDiagnostics, SpectrumSnapshot};
use crate::models::config::SpectrumConfiguration;
use crate::models::error::CaptureError;
use crate::models::state::CaptureState;
use crate::processing::mailbox::SpectrumMailbox;
use crate::processing::pipeline::SpectrumPipeline;
use crate::traits::capture_provider::CaptureProvider;
use crate::traits::spectrum_delegate::SpectrumDelegate;

/// Everything the device callback touches, behind one lock.
///
/// `active` is the guard flag shared by the callback and `stop()`: it is only
/// cleared while holding the lock, so once `stop()` has taken the lock no
/// cycle can start or publish anymore.
struct PipelineState {
    pipeline: SpectrumPipeline,
    active: bool,
    sequence: u64,
    outbox: Arc<SpectrumMailbox>,
    notifier: Notifier,
    diagnostics: SpectrumDiagnostics,
}

impl PipelineState {
    fn run_cycle(&mut self, bytes: &[u8], valid_bytes: usize, sensitivity: f64) {
        self.diagnostics.buffers_received += 1;
        let bars = self.pipeline.process(bytes, valid_bytes, sensitivity);
        self.sequence += 1;

        // Copy out and wake the notification thread; neither blocks.
        self.outbox.on_spectrum(self.sequence, bars);
        self.notifier.frame_ready();

        if self.pipeline.last_was_short() {
            self.diagnostics.short_buffers += 1;
        }
        self.diagnostics.frames_published += 1;
    }

    fn report_error(&mut self, error: CaptureError) {
        self.diagnostics.stream_errors += 1;
        log::error!("Input stream error: {}", error);
        self.notifier.error(error);
    }
}

/// Live audio → spectrum session.
///
/// Owns the input provider and every pipeline buffer. Each device buffer is
/// processed synchronously on the provider's callback thread and the result
/// is copied into the session's outbox:
/// ```text
/// [CaptureProvider] → PCM16 → [SpectrumPipeline] → outbox ┄┄▶ spectrum-notify → [SpectrumDelegate]
/// ```
///
/// The delegate runs on a separate `spectrum-notify` thread with owned
/// copies, so a slow or panicking consumer never holds up the device or
/// `stop()`. Frames coalesce: a delegate that falls behind gets the newest.
///
/// The control surface (`start`, `stop`, `set_sensitivity`, ...) is meant to
/// be driven from the consumer's thread. `start`/`stop` are idempotent, and
/// after `dispose` (or drop) every call is a no-op.
pub struct CaptureSession<P: CaptureProvider> {
    provider: P,
    config: SpectrumConfiguration,
    state: CaptureState,
    shared: Arc<Mutex<PipelineState>>,
    outbox: Arc<SpectrumMailbox>,
    dispatcher: NotificationDispatcher,

    // f64 bits; read once per cycle by the callback.
    sensitivity: Arc<AtomicU64>,
}

impl<P: CaptureProvider> CaptureSession<P> {
    /// Validate `config` and allocate all pipeline buffers.
    ///
    /// Fails with `InvalidConfiguration` if the configuration is unusable;
    /// nothing is opened until `start`.
    pub fn new(provider: P, config: SpectrumConfiguration) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::InvalidConfiguration)?;

        let outbox = Arc::new(SpectrumMailbox::new(config.bar_count));
        let dispatcher = NotificationDispatcher::spawn(Arc::clone(&outbox))?;

        let shared = PipelineState {
            pipeline: SpectrumPipeline::new(&config),
            active: false,
            sequence: 0,
            outbox: Arc::clone(&outbox),
            notifier: dispatcher.notifier(),
            diagnostics: SpectrumDiagnostics::default(),
        };

        log::debug!(
            "Spectrum session: {} Hz, {} samples/buffer, FFT {}, {} bars",
            config.sample_rate,
            config.buffer_samples,
            config.transform_size,
            config.bar_count
        );

        Ok(Self {
            provider,
            sensitivity: Arc::new(AtomicU64::new(config.sensitivity.to_bits())),
            config,
            state: CaptureState::Idle,
            shared: Arc::new(Mutex::new(shared)),
            outbox,
            dispatcher,
        })
    }

    /// Install the receiver for spectra, state changes and errors.
    ///
    /// Its methods are called on the `spectrum-notify` thread.
    pub fn set_delegate(&self, delegate: Arc<dyn SpectrumDelegate>) {
        if self.state.is_disposed() {
            return;
        }
        self.dispatcher.set_delegate(Some(delegate));
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_capturing(&self) -> bool {
        self.state.is_capturing()
    }

    pub fn bar_count(&self) -> usize {
        self.config.bar_count
    }

    pub fn config(&self) -> &SpectrumConfiguration {
        &self.config
    }

    pub fn device_info(&self) -> AudioSource {
        self.provider.device_info()
    }

    pub fn diagnostics(&self) -> SpectrumDiagnostics {
        let mut diagnostics = self.shared.lock().diagnostics.clone();
        diagnostics.delegate_panics = self.dispatcher.panics();
        diagnostics
    }

    /// Copy of the most recently published spectrum, whether or not the
    /// delegate has seen it yet.
    pub fn latest_spectrum(&self) -> Option<SpectrumSnapshot> {
        self.outbox.latest()
    }

    /// Sequence number of the most recently published spectrum (0 before the first).
    pub fn published_sequence(&self) -> u64 {
        self.outbox.sequence()
    }

    pub fn sensitivity(&self) -> f64 {
        f64::from_bits(self.sensitivity.load(Ordering::Relaxed))
    }

    /// Change the logarithmic scaling factor.
    ///
    /// Safe to call while capturing; the new value is used from the next
    /// buffer on. Negative values are clamped to 0, non-finite values ignored.
    pub fn set_sensitivity(&self, value: f64) {
        if !value.is_finite() {
            log::warn!("Ignoring non-finite sensitivity {}", value);
            return;
        }
        self.sensitivity
            .store(value.max(0.0).to_bits(), Ordering::Relaxed);
    }

    /// Open the input and begin publishing spectra. Transitions: idle → capturing.
    ///
    /// No-op when already capturing or disposed. On failure the session stays idle.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if !self.state.is_idle() {
            return Ok(());
        }
        if !self.provider.is_available() {
            return Err(CaptureError::DeviceUnavailable);
        }

        // Arm before the device can deliver its first buffer.
        self.shared.lock().active = true;

        let on_buffer = {
            let shared = Arc::clone(&self.shared);
            let sensitivity = Arc::clone(&self.sensitivity);
            Arc::new(move |bytes: &[u8], valid_bytes: usize| {
                let mut guard = shared.lock();
                if !guard.active {
                    return;
                }
                let s = f64::from_bits(sensitivity.load(Ordering::Relaxed));
                guard.run_cycle(bytes, valid_bytes, s);
            })
        };

        let on_error = {
            let shared = Arc::clone(&self.shared);
            Arc::new(move |error: CaptureError| {
                let mut guard = shared.lock();
                if guard.active {
                    guard.report_error(error);
                }
            })
        };

        if let Err(e) = self.provider.start(&self.config, on_buffer, on_error) {
            self.shared.lock().active = false;
            log::warn!("Failed to start capture: {}", e);
            return Err(e);
        }

        log::debug!("Capture started on {}", self.provider.device_info().name);
        self.set_state(CaptureState::Capturing);
        Ok(())
    }

    /// Stop streaming and release the device. Transitions: capturing → idle.
    ///
    /// No-op when idle or disposed. When this returns, no further spectrum
    /// is published, even if the device still fires a late callback. A frame
    /// the delegate has not picked up yet is dropped; one already being
    /// delivered may finish concurrently.
    pub fn stop(&mut self) -> Result<(), CaptureError> {
        if !self.state.is_capturing() {
            return Ok(());
        }

        // Waits for an in-flight cycle, never for the delegate.
        self.shared.lock().active = false;
        self.outbox.discard_unread();

        let result = self.provider.stop();
        if let Err(ref e) = result {
            log::warn!("Error while stopping capture: {}", e);
        }

        log::debug!("Capture stopped");
        self.set_state(CaptureState::Idle);
        result
    }

    /// Stop if needed and release everything. Later calls do nothing.
    ///
    /// Waits for the delegate to receive the final state change.
    pub fn dispose(&mut self) {
        if self.state.is_disposed() {
            return;
        }
        if let Err(e) = self.stop() {
            log::warn!("Error while disposing capture session: {}", e);
        }
        self.set_state(CaptureState::Disposed);
        self.dispatcher.shutdown();
        self.dispatcher.set_delegate(None);
    }

    // --- Internal helpers ---

    fn set_state(&mut self, new_state: CaptureState) {
        self.state = new_state;
        self.shared.lock().notifier.state_changed(new_state);
    }

    #[cfg(test)]
    fn flush_notifications(&self) {
        self.dispatcher.flush();
    }
}

impl<P: CaptureProvider> Drop for CaptureSession<P> {
    fn drop(&mut self) {
        self.dispose();
    }
}
