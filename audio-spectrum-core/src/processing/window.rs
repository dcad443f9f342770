use std::f32::consts::PI;

/// Precomputed Hann window.
///
/// `w[i] = 0.5 * (1 - cos(2π·i / (N - 1)))`, the symmetric form: both end
/// points are zero and the curve peaks at the centre.
#[derive(Debug, Clone, PartialEq)]
pub struct HannWindow {
    coefficients: Box<[f32]>,
}

impl HannWindow {
    pub fn new(len: usize) -> Self {
        let den = (len.max(2) - 1) as f32;
        let coefficients = (0..len)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / den).cos()))
            .collect();
        Self { coefficients }
    }

    pub fn coefficients(&self) -> &[f32] {
        &self.coefficients
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Multiply `samples` by the window in place.
    ///
    /// Only the overlapping prefix is touched if the lengths differ.
    pub fn apply(&self, samples: &mut [f32]) {
        for (sample, &w) in samples.iter_mut().zip(self.coefficients.iter()) {
            *sample *= w;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn edges_are_zero() {
        let window = HannWindow::new(1024);
        assert_abs_diff_eq!(window.coefficients()[0], 0.0);
        assert_abs_diff_eq!(window.coefficients()[1023], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn odd_length_peaks_at_one() {
        let window = HannWindow::new(1025);
        assert_abs_diff_eq!(window.coefficients()[512], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn even_length_centre_pair_near_one() {
        let window = HannWindow::new(1024);
        let c = window.coefficients();
        assert_abs_diff_eq!(c[511], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(c[512], 1.0, epsilon = 1e-5);
        assert!(c.iter().all(|&w| (0.0..=1.0).contains(&w)));
    }

    #[test]
    fn deterministic() {
        assert_eq!(HannWindow::new(256), HannWindow::new(256));
    }

    #[test]
    fn symmetric() {
        let window = HannWindow::new(64);
        let c = window.coefficients();
        for i in 0..32 {
            assert_abs_diff_eq!(c[i], c[63 - i], epsilon = 1e-6);
        }
    }

    #[test]
    fn apply_multiplies_elementwise() {
        let window = HannWindow::new(5);
        let mut samples = [1.0f32; 5];
        window.apply(&mut samples);
        assert_eq!(&samples[..], window.coefficients());
    }
}
