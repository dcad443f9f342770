//! Input device enumeration via the cpal default host.

use cpal::traits::{DeviceTrait, HostTrait};

use audio_spectrum_core::models::audio_models::AudioSource;
use audio_spectrum_core::models::error::CaptureError;

/// Audio input device enumerator.
pub struct DeviceEnumerator {
    host: cpal::Host,
}

impl DeviceEnumerator {
    /// Enumerator over the platform's default audio host.
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// Name of the host backend (ALSA, CoreAudio, WASAPI, ...).
    pub fn host_name(&self) -> &'static str {
        self.host.id().name()
    }

    /// List input devices. The default device, if any, is flagged.
    ///
    /// Devices whose name cannot be read are skipped.
    pub fn list_capture_devices(&self) -> Result<Vec<AudioSource>, CaptureError> {
        let default_name = self.default_capture_device_name().ok();
        let devices = self
            .host
            .input_devices()
            .map_err(|e| CaptureError::StreamFailed(format!("failed to list input devices: {}", e)))?;

        let mut sources = Vec::new();
        for device in devices {
            let name = match device.name() {
                Ok(name) => name,
                Err(e) => {
                    log::debug!("Skipping input device without a name: {}", e);
                    continue;
                }
            };
            sources.push(AudioSource {
                id: name.clone(),
                is_default: default_name.as_deref() == Some(name.as_str()),
                name,
            });
        }
        Ok(sources)
    }

    /// Name of the default input device.
    pub fn default_capture_device_name(&self) -> Result<String, CaptureError> {
        let device = self
            .host
            .default_input_device()
            .ok_or(CaptureError::DeviceUnavailable)?;
        device
            .name()
            .map_err(|e| CaptureError::StreamFailed(format!("failed to read device name: {}", e)))
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}
