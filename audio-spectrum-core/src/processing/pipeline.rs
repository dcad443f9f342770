use crate::models::config::SpectrumConfiguration;
use crate::processing::aggregator::SpectrumAggregator;
use crate::processing::sample_converter::convert_pcm16_le;
use crate::processing::transform::SpectralTransform;
use crate::processing::window::HannWindow;

/// The per-buffer computation, with every working buffer preallocated.
///
/// ```text
/// raw PCM16 → [convert] → samples → [Hann] → [FFT] → coefficients → [aggregate] → bars
/// ```
///
/// `process` reuses the same sample frame, coefficient buffer and bar array
/// on every call, so steady-state processing performs no heap allocation.
#[derive(Debug)]
pub struct SpectrumPipeline {
    window: HannWindow,
    transform: SpectralTransform,
    aggregator: SpectrumAggregator,
    samples: Vec<f32>,
    bars: Vec<f32>,
    last_converted: usize,
}

impl SpectrumPipeline {
    /// Build a pipeline for an already validated configuration.
    pub fn new(config: &SpectrumConfiguration) -> Self {
        Self {
            window: HannWindow::new(config.buffer_samples),
            transform: SpectralTransform::new(config.transform_size),
            aggregator: SpectrumAggregator::new(config.transform_size, config.bar_count),
            samples: vec![0.0; config.buffer_samples],
            bars: vec![0.0; config.bar_count],
            last_converted: 0,
        }
    }

    /// Run one device buffer through the whole chain and return the bars.
    ///
    /// Reads at most `valid_bytes` of `raw`. Short buffers are zero-padded.
    pub fn process(&mut self, raw: &[u8], valid_bytes: usize, sensitivity: f64) -> &[f32] {
        self.last_converted = convert_pcm16_le(raw, valid_bytes, &mut self.samples);
        self.window.apply(&mut self.samples);
        let coefficients = self.transform.process(&self.samples);
        self.aggregator.aggregate(coefficients, sensitivity, &mut self.bars);
        &self.bars
    }

    /// Whether the most recent buffer was shorter than a full frame.
    pub fn last_was_short(&self) -> bool {
        self.last_converted < self.samples.len()
    }

    pub fn bars(&self) -> &[f32] {
        &self.bars
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn window(&self) -> &HannWindow {
        &self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::aggregator::scale_power;
    use std::f64::consts::PI;

    fn tone_bytes(config: &SpectrumConfiguration, hz: f64, amplitude: f64) -> Vec<u8> {
        (0..config.buffer_samples)
            .flat_map(|i| {
                let t = i as f64 / config.sample_rate as f64;
                let v = (amplitude * (2.0 * PI * hz * t).sin() * 32767.0).round() as i16;
                v.to_le_bytes()
            })
            .collect()
    }

    /// Deterministic full-scale noise (xorshift).
    fn noise_bytes(len: usize) -> Vec<u8> {
        let mut state: u32 = 0x9E37_79B9;
        (0..len)
            .flat_map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state as u16 as i16).to_le_bytes()
            })
            .collect()
    }

    #[test]
    fn silence_yields_exact_floor() {
        let config = SpectrumConfiguration::default();
        let mut pipeline = SpectrumPipeline::new(&config);
        let floor = (((1e-10f64).log10() * 1.0 + 10.0) / 10.0).max(0.0) as f32;

        let bars = pipeline.process(&[], 0, 1.0);
        assert_eq!(bars.len(), 64);
        assert!(bars.iter().all(|&b| b == floor));
        assert!(pipeline.last_was_short());
    }

    #[test]
    fn silence_floor_tracks_sensitivity() {
        let config = SpectrumConfiguration::default();
        let mut pipeline = SpectrumPipeline::new(&config);
        let zeros = vec![0u8; config.buffer_bytes()];

        let bars = pipeline.process(&zeros, zeros.len(), 0.5);
        assert!(bars.iter().all(|&b| b == scale_power(0.0, 0.5)));
        assert!(!pipeline.last_was_short());
    }

    #[test]
    fn single_tone_concentrates_in_one_bar() {
        let config = SpectrumConfiguration::default();
        let mut pipeline = SpectrumPipeline::new(&config);

        // Bin 100 sits in the middle of bar 12 (bins 96..104).
        let hz = 100.0 * config.bin_resolution_hz();
        let expected_bar = config.bar_for_frequency(hz).unwrap();
        assert_eq!(expected_bar, 12);

        let bytes = tone_bytes(&config, hz, 0.8);
        let bars = pipeline.process(&bytes, bytes.len(), 1.0).to_vec();

        let (peak_bar, peak) = bars
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::MIN), |best, (i, v)| if v > best.1 { (i, v) } else { best });
        assert_eq!(peak_bar, expected_bar);
        for (i, &v) in bars.iter().enumerate() {
            if i != peak_bar {
                assert!(v < peak - 0.25, "bar {i} = {v} too close to peak {peak}");
            }
        }
    }

    #[test]
    fn sensitivity_never_lowers_loud_bars() {
        let config = SpectrumConfiguration::default();
        let mut pipeline = SpectrumPipeline::new(&config);
        let bytes = noise_bytes(config.buffer_samples);

        let base = pipeline.process(&bytes, bytes.len(), 1.0).to_vec();
        let boosted = pipeline.process(&bytes, bytes.len(), 1.5).to_vec();

        // Bars at or above 1.0 carry average power ≥ 1, where the log is
        // non-negative and a larger factor can only push them up.
        let loud: Vec<usize> = (0..base.len()).filter(|&i| base[i] >= 1.0).collect();
        assert!(loud.len() > base.len() / 2);
        for i in loud {
            assert!(boosted[i] >= base[i], "bar {i}: {} < {}", boosted[i], base[i]);
        }
    }

    #[test]
    fn bar_count_is_stable_across_buffer_sizes() {
        let config = SpectrumConfiguration {
            transform_size: 2048,
            bar_count: 32,
            ..Default::default()
        };
        let mut pipeline = SpectrumPipeline::new(&config);
        let noise = noise_bytes(config.buffer_samples * 2);

        for valid in [0, 1, 2, 100, 2048, 4096] {
            assert_eq!(pipeline.process(&noise, valid, 1.0).len(), 32);
        }
        assert_eq!(pipeline.bar_count(), 32);
    }

    #[test]
    fn processing_is_deterministic() {
        let config = SpectrumConfiguration::default();
        let mut pipeline = SpectrumPipeline::new(&config);
        let bytes = noise_bytes(config.buffer_samples);

        let first = pipeline.process(&bytes, bytes.len(), 1.0).to_vec();
        pipeline.process(&[], 0, 1.0);
        let second = pipeline.process(&bytes, bytes.len(), 1.0).to_vec();
        assert_eq!(first, second);
    }
}
