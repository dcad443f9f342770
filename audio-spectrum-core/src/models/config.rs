use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a spectrum capture session.
///
/// Everything here is fixed for the lifetime of a session; buffers are sized
/// from it once at construction. Only `sensitivity` is an initial value that
/// can be changed later through `CaptureSession::set_sensitivity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfiguration {
    /// Capture sample rate in Hz (default: 44100).
    pub sample_rate: u32,

    /// Number of capture channels. Only mono (1) is supported.
    pub channels: u16,

    /// PCM bit depth. Only signed 16-bit is supported.
    pub bit_depth: u16,

    /// Samples per device buffer (default: 1024, ≈23 ms at 44.1 kHz).
    pub buffer_samples: usize,

    /// FFT length. Must be at least `buffer_samples`; the tail is zero-padded.
    pub transform_size: usize,

    /// Number of display bars (default: 64).
    pub bar_count: usize,

    /// Initial logarithmic scaling factor (default: 1.0).
    pub sensitivity: f64,
}

impl SpectrumConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.channels != 1 {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        if self.bit_depth != 16 {
            return Err(format!("unsupported bit depth: {}", self.bit_depth));
        }
        if self.buffer_samples == 0 {
            return Err("buffer sample count must be positive".into());
        }
        if self.transform_size < self.buffer_samples {
            return Err(format!(
                "transform size {} is smaller than buffer sample count {}",
                self.transform_size, self.buffer_samples
            ));
        }
        if self.bar_count == 0 {
            return Err("bar count must be positive".into());
        }
        let usable = self.usable_bins();
        if self.bar_count > usable || usable % self.bar_count != 0 {
            return Err(format!(
                "bar count {} does not evenly divide {} usable bins",
                self.bar_count, usable
            ));
        }
        if !self.sensitivity.is_finite() || self.sensitivity < 0.0 {
            return Err(format!("invalid sensitivity: {}", self.sensitivity));
        }
        Ok(())
    }

    /// Non-negative frequency bins read by the aggregator (`transform_size / 2`).
    pub fn usable_bins(&self) -> usize {
        self.transform_size / 2
    }

    pub fn bins_per_bar(&self) -> usize {
        if self.bar_count == 0 {
            return 0;
        }
        self.usable_bins() / self.bar_count
    }

    /// Width of one FFT bin in Hz.
    pub fn bin_resolution_hz(&self) -> f64 {
        self.sample_rate as f64 / self.transform_size as f64
    }

    /// Size in bytes of one full device buffer.
    pub fn buffer_bytes(&self) -> usize {
        self.buffer_samples * (self.bit_depth as usize / 8) * self.channels as usize
    }

    /// Wall-clock length of one full device buffer.
    pub fn buffer_duration(&self) -> Duration {
        Duration::from_secs_f64(self.buffer_samples as f64 / self.sample_rate as f64)
    }

    /// Frequency range `[low, high)` in Hz covered by bar `index`.
    pub fn bar_frequency_range(&self, index: usize) -> Option<(f64, f64)> {
        if index >= self.bar_count {
            return None;
        }
        let bins = self.bins_per_bar() as f64;
        let resolution = self.bin_resolution_hz();
        let low = index as f64 * bins * resolution;
        Some((low, low + bins * resolution))
    }

    /// Bar whose bin range contains `hz`, or `None` above the last bar.
    pub fn bar_for_frequency(&self, hz: f64) -> Option<usize> {
        let bins = self.bins_per_bar();
        if hz < 0.0 || bins == 0 {
            return None;
        }
        let bin = (hz / self.bin_resolution_hz()).floor() as usize;
        let bar = bin / bins;
        (bar < self.bar_count).then_some(bar)
    }
}

impl Default for SpectrumConfiguration {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 1,
            bit_depth: 16,
            buffer_samples: 1024,
            transform_size: 1024,
            bar_count: 64,
            sensitivity: 1.0,
        }
    }
}
