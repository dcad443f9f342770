use parking_lot::Mutex;

use crate::models::audio_models::SpectrumSnapshot;
use crate::models::error::CaptureError;
use crate::models::state::CaptureState;
use crate::traits::spectrum_delegate::SpectrumDelegate;

#[derive(Debug)]
struct Slot {
    bars: Vec<f32>,
    sequence: u64,
    unread: bool,
    state: CaptureState,
    last_error: Option<CaptureError>,
}

/// Single-slot, latest-wins handoff from the capture thread to a consumer.
///
/// The session posts into it on every buffer; the consumer reads on its own
/// schedule (a UI timer, a render loop). Nothing queues: a slow consumer
/// just sees a larger jump in `sequence`.
///
/// Both sides only hold the lock for a copy of `bar_count` floats, and the
/// producer side never allocates.
#[derive(Debug)]
pub struct SpectrumMailbox {
    slot: Mutex<Slot>,
}

impl SpectrumMailbox {
    pub fn new(bar_count: usize) -> Self {
        Self {
            slot: Mutex::new(Slot {
                bars: vec![0.0; bar_count],
                sequence: 0,
                unread: false,
                state: CaptureState::Idle,
                last_error: None,
            }),
        }
    }

    /// Take the newest spectrum if it has not been read yet.
    pub fn take_latest(&self) -> Option<SpectrumSnapshot> {
        let mut slot = self.slot.lock();
        if !slot.unread {
            return None;
        }
        slot.unread = false;
        Some(SpectrumSnapshot {
            sequence: slot.sequence,
            bars: slot.bars.clone(),
        })
    }

    /// The newest spectrum, read or not. `None` before the first publication.
    pub fn latest(&self) -> Option<SpectrumSnapshot> {
        let slot = self.slot.lock();
        (slot.sequence > 0).then(|| SpectrumSnapshot {
            sequence: slot.sequence,
            bars: slot.bars.clone(),
        })
    }

    /// Copy the newest bars into `out` without allocating.
    ///
    /// Returns the sequence number of the copied frame, or `None` if nothing
    /// new arrived since the last read.
    pub fn read_into(&self, out: &mut [f32]) -> Option<u64> {
        let mut slot = self.slot.lock();
        if !slot.unread {
            return None;
        }
        slot.unread = false;
        let n = out.len().min(slot.bars.len());
        out[..n].copy_from_slice(&slot.bars[..n]);
        Some(slot.sequence)
    }

    /// Mark the newest frame as read without taking it.
    pub fn discard_unread(&self) {
        self.slot.lock().unread = false;
    }

    /// Sequence number of the newest posted frame (0 before the first one).
    pub fn sequence(&self) -> u64 {
        self.slot.lock().sequence
    }

    /// Last state announced by the session.
    pub fn state(&self) -> CaptureState {
        self.slot.lock().state
    }

    /// Take the most recent stream error, if any.
    pub fn take_error(&self) -> Option<CaptureError> {
        self.slot.lock().last_error.take()
    }
}

impl SpectrumDelegate for SpectrumMailbox {
    fn on_spectrum(&self, sequence: u64, bars: &[f32]) {
        let mut slot = self.slot.lock();
        if slot.bars.len() != bars.len() {
            // Only happens if the mailbox was built for another bar count.
            slot.bars.resize(bars.len(), 0.0);
        }
        slot.bars.copy_from_slice(bars);
        slot.sequence = sequence;
        slot.unread = true;
    }

    fn on_state_changed(&self, state: CaptureState) {
        self.slot.lock().state = state;
    }

    fn on_error(&self, error: &CaptureError) {
        self.slot.lock().last_error = Some(error.clone());
    }
}
