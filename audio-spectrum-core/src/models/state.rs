/// Capture session state.
///
/// State transitions:
/// ```text
/// idle ⇄ capturing
///   ↓        ↓
///     disposed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing,
    Disposed,
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Capturing)
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed)
    }
}
