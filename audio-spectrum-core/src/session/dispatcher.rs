use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::models::error::CaptureError;
use crate::models::state::CaptureState;
use crate::processing::mailbox::SpectrumMailbox;
use crate::traits::spectrum_delegate::SpectrumDelegate;

type SharedDelegate = Arc<Mutex<Option<Arc<dyn SpectrumDelegate>>>>;

enum Notice {
    /// A new frame is waiting in the outbox.
    Frame,
    State(CaptureState),
    Error(CaptureError),
    #[cfg(test)]
    Flush(Sender<()>),
    Shutdown,
}

/// Producer side of the notification channel.
///
/// Every method returns immediately. Frame wake-ups are coalesced, so a
/// consumer that falls behind costs at most one pending message.
#[derive(Clone)]
pub(crate) struct Notifier {
    tx: Sender<Notice>,
    frame_pending: Arc<AtomicBool>,
}

impl Notifier {
    pub(crate) fn frame_ready(&self) {
        if !self.frame_pending.swap(true, Ordering::AcqRel) {
            let _ = self.tx.send(Notice::Frame);
        }
    }

    pub(crate) fn state_changed(&self, state: CaptureState) {
        let _ = self.tx.send(Notice::State(state));
    }

    pub(crate) fn error(&self, error: CaptureError) {
        let _ = self.tx.send(Notice::Error(error));
    }
}

/// Delivers session notifications to the delegate on the `spectrum-notify` thread.
///
/// Spectra are taken from the session's outbox as owned snapshots, so the
/// delegate never sees a pipeline buffer and never runs on the device thread
/// or under the pipeline lock.
pub(crate) struct NotificationDispatcher {
    notifier: Notifier,
    delegate: SharedDelegate,
    panics: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl NotificationDispatcher {
    pub(crate) fn spawn(outbox: Arc<SpectrumMailbox>) -> Result<Self, CaptureError> {
        let (tx, rx) = mpsc::channel();
        let notifier = Notifier {
            tx,
            frame_pending: Arc::new(AtomicBool::new(false)),
        };
        let delegate: SharedDelegate = Arc::new(Mutex::new(None));
        let panics = Arc::new(AtomicU64::new(0));

        let worker = Worker {
            outbox,
            frame_pending: Arc::clone(&notifier.frame_pending),
            delegate: Arc::clone(&delegate),
            panics: Arc::clone(&panics),
        };
        let handle = thread::Builder::new()
            .name("spectrum-notify".into())
            .spawn(move || worker.run(rx))
            .map_err(|e| {
                CaptureError::StreamFailed(format!("failed to spawn notification thread: {}", e))
            })?;

        Ok(Self {
            notifier,
            delegate,
            panics,
            handle: Some(handle),
        })
    }

    pub(crate) fn notifier(&self) -> Notifier {
        self.notifier.clone()
    }

    pub(crate) fn set_delegate(&self, delegate: Option<Arc<dyn SpectrumDelegate>>) {
        *self.delegate.lock() = delegate;
    }

    pub(crate) fn panics(&self) -> u64 {
        self.panics.load(Ordering::Relaxed)
    }

    /// Deliver everything queued so far, then stop the thread.
    pub(crate) fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.notifier.tx.send(Notice::Shutdown);
        // A delegate that drops the session from inside a callback must not join itself.
        if handle.thread().id() != thread::current().id() && handle.join().is_err() {
            log::error!("Notification thread terminated abnormally");
        }
    }

    /// Block until every notice sent before this call has been delivered.
    #[cfg(test)]
    pub(crate) fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::channel();
        if self.notifier.tx.send(Notice::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }
}

impl Drop for NotificationDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    outbox: Arc<SpectrumMailbox>,
    frame_pending: Arc<AtomicBool>,
    delegate: SharedDelegate,
    panics: Arc<AtomicU64>,
}

impl Worker {
    fn run(self, rx: Receiver<Notice>) {
        for notice in rx {
            match notice {
                Notice::Frame => {
                    self.frame_pending.store(false, Ordering::Release);
                    let Some(snapshot) = self.outbox.take_latest() else {
                        continue;
                    };
                    let delivered = self.deliver("on_spectrum", |d| {
                        d.on_spectrum(snapshot.sequence, &snapshot.bars)
                    });
                    if !delivered {
                        let error = CaptureError::StreamFailed("spectrum delegate panicked".into());
                        self.deliver("on_error", |d| d.on_error(&error));
                    }
                }
                Notice::State(state) => {
                    self.deliver("on_state_changed", |d| d.on_state_changed(state));
                }
                Notice::Error(error) => {
                    self.deliver("on_error", |d| d.on_error(&error));
                }
                #[cfg(test)]
                Notice::Flush(ack) => {
                    let _ = ack.send(());
                }
                Notice::Shutdown => break,
            }
        }
        log::debug!("Notification thread exiting");
    }

    /// Call the current delegate, containing any panic. Returns false if it panicked.
    fn deliver(&self, what: &str, call: impl FnOnce(&dyn SpectrumDelegate)) -> bool {
        let Some(delegate) = self.delegate.lock().clone() else {
            return true;
        };
        match panic::catch_unwind(AssertUnwindSafe(|| call(delegate.as_ref()))) {
            Ok(()) => true,
            Err(_) => {
                self.panics.fetch_add(1, Ordering::Relaxed);
                log::error!("Spectrum delegate panicked in {}", what);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        frames: Mutex<Vec<u64>>,
        states: Mutex<Vec<CaptureState>>,
        errors: Mutex<Vec<CaptureError>>,
    }

    impl SpectrumDelegate for Recorder {
        fn on_spectrum(&self, sequence: u64, _bars: &[f32]) {
            self.frames.lock().push(sequence);
        }

        fn on_state_changed(&self, state: CaptureState) {
            self.states.lock().push(state);
        }

        fn on_error(&self, error: &CaptureError) {
            self.errors.lock().push(error.clone());
        }
    }

    fn dispatcher() -> (NotificationDispatcher, Arc<SpectrumMailbox>, Arc<Recorder>) {
        let outbox = Arc::new(SpectrumMailbox::new(2));
        let dispatcher = NotificationDispatcher::spawn(Arc::clone(&outbox)).unwrap();
        let recorder = Arc::new(Recorder::default());
        dispatcher.set_delegate(Some(recorder.clone()));
        (dispatcher, outbox, recorder)
    }

    #[test]
    fn delivers_notices_in_order() {
        let (dispatcher, outbox, recorder) = dispatcher();
        let notifier = dispatcher.notifier();

        notifier.state_changed(CaptureState::Capturing);
        outbox.on_spectrum(1, &[0.1, 0.2]);
        notifier.frame_ready();
        dispatcher.flush();
        notifier.error(CaptureError::DeviceUnavailable);
        notifier.state_changed(CaptureState::Idle);
        dispatcher.flush();

        assert_eq!(*recorder.frames.lock(), vec![1]);
        assert_eq!(
            *recorder.states.lock(),
            vec![CaptureState::Capturing, CaptureState::Idle]
        );
        assert_eq!(*recorder.errors.lock(), vec![CaptureError::DeviceUnavailable]);
    }

    #[test]
    fn coalesced_frames_deliver_the_newest() {
        let (dispatcher, outbox, recorder) = dispatcher();
        let notifier = dispatcher.notifier();

        // Hold the delegate lock so the worker cannot deliver yet.
        let guard = dispatcher.delegate.lock();
        for seq in 1..=5 {
            outbox.on_spectrum(seq, &[0.0, 0.0]);
            notifier.frame_ready();
        }
        drop(guard);
        dispatcher.flush();

        let frames = recorder.frames.lock().clone();
        assert_eq!(frames.last(), Some(&5));
        assert!(frames.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn discarded_frame_is_not_delivered() {
        let (dispatcher, outbox, recorder) = dispatcher();
        outbox.on_spectrum(1, &[0.0, 0.0]);
        outbox.discard_unread();
        dispatcher.notifier().frame_ready();
        dispatcher.flush();

        assert!(recorder.frames.lock().is_empty());
    }

    #[test]
    fn shutdown_is_idempotent_and_drops_later_notices() {
        let (mut dispatcher, _, recorder) = dispatcher();
        let notifier = dispatcher.notifier();
        notifier.state_changed(CaptureState::Capturing);
        dispatcher.shutdown();
        dispatcher.shutdown();

        notifier.state_changed(CaptureState::Idle);
        assert_eq!(*recorder.states.lock(), vec![CaptureState::Capturing]);
    }
}
