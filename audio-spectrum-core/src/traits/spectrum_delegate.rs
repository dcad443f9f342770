use crate::models::error::CaptureError;
use crate::models::state::CaptureState;

/// Receiver of session notifications.
///
/// All methods are called on the session's `spectrum-notify` thread, never on
/// the device thread. A slow delegate only makes it skip frames. A delegate
/// that feeds a UI should hand the bars over to the UI thread (see
/// `SpectrumMailbox`).
pub trait SpectrumDelegate: Send + Sync {
    /// Called with a copy of the newest spectrum, exactly `bar_count` values.
    ///
    /// `sequence` starts at 1 and increases by one per processed buffer;
    /// gaps mean frames were superseded before they could be delivered.
    fn on_spectrum(&self, sequence: u64, bars: &[f32]);

    /// Called when the session state changes.
    fn on_state_changed(&self, _state: CaptureState) {}

    /// Called when an error occurs after capture started.
    fn on_error(&self, _error: &CaptureError) {}
}

impl<F> SpectrumDelegate for F
where
    F: Fn(u64, &[f32]) + Send + Sync,
{
    fn on_spectrum(&self, sequence: u64, bars: &[f32]) {
        self(sequence, bars)
    }
}
