//! # audio-spectrum-core
//!
//! Platform-agnostic live audio spectrum core.
//!
//! Turns 16-bit mono PCM buffers from an input device into a fixed number of
//! log-scaled spectrum bars and hands them to a consumer. Platform backends
//! (cpal) implement the `CaptureProvider` trait and plug into `CaptureSession`.
//!
//! ## Architecture
//!
//! ```text
//! audio-spectrum-core (this crate)
//! ├── traits/       ← CaptureProvider, SpectrumDelegate
//! ├── models/       ← CaptureError, CaptureState, SpectrumConfiguration, SpectrumSnapshot, etc.
//! ├── processing/   ← HannWindow, PCM16 conversion, SpectralTransform, SpectrumAggregator,
//! │                   SpectrumPipeline, SpectrumMailbox
//! └── session/      ← CaptureSession (orchestrator), notification thread
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioSource, SpectrumDiagnostics, SpectrumSnapshot};
pub use models::config::SpectrumConfiguration;
pub use models::error::CaptureError;
pub use models::state::CaptureState;
pub use processing::aggregator::SpectrumAggregator;
pub use processing::mailbox::SpectrumMailbox;
pub use processing::pipeline::SpectrumPipeline;
pub use processing::sample_converter::convert_pcm16_le;
pub use processing::transform::SpectralTransform;
pub use processing::window::HannWindow;
pub use session::capture_session::CaptureSession;
pub use traits::capture_provider::{CaptureProvider, RawBufferCallback, StreamErrorCallback};
pub use traits::spectrum_delegate::SpectrumDelegate;
