use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Forward FFT over a zero-padded real frame.
///
/// Convention: the unnormalized forward DFT `X[k] = Σ x[n]·e^{-2πi·kn/M}` as
/// computed by `rustfft`. No `1/M` factor is applied, so the power values the
/// aggregator sees scale with `M²`; the `+10` offset in the bar normalization
/// is calibrated against this convention.
///
/// The plan, coefficient buffer and scratch space are allocated once here;
/// `process` does not allocate.
pub struct SpectralTransform {
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectralTransform {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Self {
            fft,
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch,
        }
    }

    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    /// Transform `samples` (at most `size()` of them) and return all `size()`
    /// coefficients in standard FFT order: DC, positive frequencies up to
    /// Nyquist, then negative frequencies.
    pub fn process(&mut self, samples: &[f32]) -> &[Complex<f32>] {
        let used = samples.len().min(self.buffer.len());
        for (slot, &x) in self.buffer.iter_mut().zip(&samples[..used]) {
            *slot = Complex::new(x, 0.0);
        }
        self.buffer[used..].fill(Complex::new(0.0, 0.0));

        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);
        &self.buffer
    }
}

impl std::fmt::Debug for SpectralTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralTransform")
            .field("size", &self.buffer.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn zeros_transform_to_exact_zeros() {
        let mut transform = SpectralTransform::new(64);
        let out = transform.process(&[0.0; 32]);
        assert_eq!(out.len(), 64);
        assert!(out.iter().all(|c| c.re == 0.0 && c.im == 0.0));
    }

    #[test]
    fn impulse_is_flat() {
        let mut transform = SpectralTransform::new(16);
        let mut samples = [0.0f32; 16];
        samples[0] = 1.0;
        for c in transform.process(&samples) {
            assert_abs_diff_eq!(c.re, 1.0, epsilon = 1e-6);
            assert_abs_diff_eq!(c.im, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn dc_bin_is_unnormalized_sum() {
        let mut transform = SpectralTransform::new(32);
        let out = transform.process(&[0.5; 32]);
        assert_abs_diff_eq!(out[0].re, 16.0, epsilon = 1e-4);
        assert_abs_diff_eq!(out[1].norm(), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn stale_samples_do_not_leak_into_padding() {
        let mut transform = SpectralTransform::new(8);
        transform.process(&[1.0; 8]);
        // Second frame is shorter; slots 2..8 must be zero again.
        let out = transform.process(&[1.0, 1.0]);
        assert_abs_diff_eq!(out[0].re, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn cosine_lands_in_its_bin() {
        let n = 128;
        let k = 10;
        let samples: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * k as f32 * i as f32 / n as f32).cos())
            .collect();
        let mut transform = SpectralTransform::new(n);
        let out = transform.process(&samples);
        assert_abs_diff_eq!(out[k].norm(), n as f32 / 2.0, epsilon = 1e-3);
        assert_abs_diff_eq!(out[n - k].norm(), n as f32 / 2.0, epsilon = 1e-3);
        assert_abs_diff_eq!(out[k + 1].norm(), 0.0, epsilon = 1e-3);
    }
}
