use thiserror::Error;

/// Errors that can occur while configuring or driving a spectrum capture session.
///
/// Short device buffers are deliberately absent: they are zero-padded by the
/// pipeline and never surface as errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("device not available")]
    DeviceUnavailable,

    #[error("permission denied")]
    PermissionDenied,

    #[error("format unsupported: {0}")]
    FormatUnsupported(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("stream failed: {0}")]
    StreamFailed(String),
}

impl CaptureError {
    /// Whether this error came from the device layer (as opposed to a
    /// construction-time configuration problem).
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            Self::DeviceUnavailable
                | Self::PermissionDenied
                | Self::FormatUnsupported(_)
                | Self::StreamFailed(_)
        )
    }
}
