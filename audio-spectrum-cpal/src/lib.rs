//! # audio-spectrum-cpal
//!
//! cpal input backend for audio-spectrum-core.
//!
//! Provides:
//! - `CpalInputCapture` — Mono 16-bit capture from the default or a named input device
//! - `DeviceEnumerator` — Input device listing via the cpal default host
//!
//! ## Platform Requirements
//! - Linux: ALSA development headers (`libasound2-dev`) for building
//! - macOS: microphone access granted to the terminal / app bundle
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use audio_spectrum_core::{CaptureSession, SpectrumConfiguration, SpectrumMailbox};
//! use audio_spectrum_cpal::CpalInputCapture;
//!
//! let mut session =
//!     CaptureSession::new(CpalInputCapture::default_device(), SpectrumConfiguration::default())?;
//! let mailbox = Arc::new(SpectrumMailbox::new(session.bar_count()));
//! session.set_delegate(mailbox.clone());
//! session.start()?;
//! ```

pub mod cpal_input;
pub mod device_enumerator;

pub use cpal_input::CpalInputCapture;
pub use device_enumerator::DeviceEnumerator;
