use rustfft::num_complex::Complex;

/// Added to the averaged power before taking `log10`, so silence maps to a
/// finite floor instead of `-inf`.
pub const LOG_EPSILON: f64 = 1e-10;

/// Offset (in decades) that maps the scaled log value onto the display range:
/// `value = max((log + FLOOR_DECADES) / FLOOR_DECADES, 0)`.
pub const FLOOR_DECADES: f64 = 10.0;

/// Reduces the non-negative half of an FFT into display bars.
///
/// Bar `i` averages the power (`|X|²`) of bins
/// `[i·bins_per_bar, min((i+1)·bins_per_bar, usable_bins))`, then applies
/// `log10(avg + ε) · sensitivity` and the floor normalization above.
///
/// The sum is always divided by `bins_per_bar`, even if the last range were
/// shorter. Values are clamped at 0 but not above; strong signals exceed 1.0
/// and display clamping is left to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpectrumAggregator {
    usable_bins: usize,
    bins_per_bar: usize,
    bar_count: usize,
}

impl SpectrumAggregator {
    /// `bar_count` must be positive and no larger than `transform_size / 2`;
    /// `SpectrumConfiguration::validate` enforces this before construction.
    pub fn new(transform_size: usize, bar_count: usize) -> Self {
        let usable_bins = transform_size / 2;
        let bins_per_bar = if bar_count == 0 { 0 } else { usable_bins / bar_count };
        Self {
            usable_bins,
            bins_per_bar,
            bar_count,
        }
    }

    pub fn bar_count(&self) -> usize {
        self.bar_count
    }

    pub fn bins_per_bar(&self) -> usize {
        self.bins_per_bar
    }

    /// Write one value per bar into `bars`.
    ///
    /// Bins missing from `coefficients` count as zero power; extra entries in
    /// `bars` are left untouched.
    pub fn aggregate(&self, coefficients: &[Complex<f32>], sensitivity: f64, bars: &mut [f32]) {
        if self.bins_per_bar == 0 {
            return;
        }
        let usable = &coefficients[..self.usable_bins.min(coefficients.len())];
        let divisor = self.bins_per_bar as f64;

        for (i, bar) in bars.iter_mut().take(self.bar_count).enumerate() {
            let start = (i * self.bins_per_bar).min(usable.len());
            let end = ((i + 1) * self.bins_per_bar).min(usable.len());
            let power: f64 = usable[start..end]
                .iter()
                .map(|c| c.norm_sqr() as f64)
                .sum();
            *bar = scale_power(power / divisor, sensitivity);
        }
    }
}

/// Log-compress one averaged power value onto the bar scale.
#[inline]
pub fn scale_power(average_power: f64, sensitivity: f64) -> f32 {
    let log_value = (average_power + LOG_EPSILON).log10() * sensitivity;
    ((log_value + FLOOR_DECADES) / FLOOR_DECADES).max(0.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat(len: usize, magnitude: f32) -> Vec<Complex<f32>> {
        vec![Complex::new(magnitude, 0.0); len]
    }

    #[test]
    fn silence_hits_floor() {
        let agg = SpectrumAggregator::new(1024, 64);
        let mut bars = [f32::NAN; 64];
        agg.aggregate(&flat(1024, 0.0), 1.0, &mut bars);

        let expected = (((1e-10f64).log10() * 1.0 + 10.0) / 10.0).max(0.0) as f32;
        assert!(bars.iter().all(|&b| b == expected));
        assert!(expected.abs() < 1e-6);
    }

    #[test]
    fn unit_power_maps_to_one() {
        let agg = SpectrumAggregator::new(16, 2);
        let mut bars = [0.0f32; 2];
        agg.aggregate(&flat(16, 1.0), 1.0, &mut bars);
        for b in bars {
            assert_relative_eq!(b, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn sums_power_not_magnitude() {
        // Bins of magnitude 10 → power 100 → log 2 → 1.2
        let agg = SpectrumAggregator::new(8, 1);
        let mut bars = [0.0f32; 1];
        agg.aggregate(&flat(8, 10.0), 1.0, &mut bars);
        assert_relative_eq!(bars[0], 1.2, epsilon = 1e-5);
    }

    #[test]
    fn negative_frequencies_are_ignored() {
        let agg = SpectrumAggregator::new(8, 2);
        let mut coefficients = flat(8, 0.0);
        for c in &mut coefficients[4..] {
            *c = Complex::new(1e6, 0.0);
        }
        let mut bars = [1.0f32; 2];
        agg.aggregate(&coefficients, 1.0, &mut bars);
        let floor = scale_power(0.0, 1.0);
        assert_eq!(bars, [floor, floor]);
    }

    #[test]
    fn averages_over_full_width() {
        // One loud bin out of four: power 1e4 / 4 → log10(2500)
        let agg = SpectrumAggregator::new(8, 1);
        let mut coefficients = flat(8, 0.0);
        coefficients[2] = Complex::new(100.0, 0.0);
        let mut bars = [0.0f32; 1];
        agg.aggregate(&coefficients, 1.0, &mut bars);
        assert_relative_eq!(bars[0], ((2500f64.log10() + 10.0) / 10.0) as f32, epsilon = 1e-6);
    }

    #[test]
    fn truncated_input_divides_by_bins_per_bar() {
        let agg = SpectrumAggregator::new(16, 2);
        // Only 6 of 8 usable bins present: bar 1 sees 2 bins but divides by 4.
        let mut bars = [0.0f32; 2];
        agg.aggregate(&flat(6, 1.0), 1.0, &mut bars);
        assert_relative_eq!(bars[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(bars[1], ((0.5f64.log10() + 10.0) / 10.0) as f32, epsilon = 1e-6);
    }

    #[test]
    fn no_upper_clamp() {
        let agg = SpectrumAggregator::new(8, 1);
        let mut bars = [0.0f32; 1];
        agg.aggregate(&flat(8, 1e5), 1.0, &mut bars);
        assert!(bars[0] > 1.0);
    }

    #[test]
    fn zero_sensitivity_flattens_to_one() {
        let agg = SpectrumAggregator::new(8, 2);
        let mut coefficients = flat(8, 0.0);
        coefficients[0] = Complex::new(30.0, 4.0);
        let mut bars = [0.0f32; 2];
        agg.aggregate(&coefficients, 0.0, &mut bars);
        assert_eq!(bars, [1.0, 1.0]);
    }

    #[test]
    fn sensitivity_raises_loud_bars() {
        let agg = SpectrumAggregator::new(8, 1);
        let coefficients = flat(8, 50.0);
        let mut low = [0.0f32; 1];
        let mut high = [0.0f32; 1];
        agg.aggregate(&coefficients, 1.0, &mut low);
        agg.aggregate(&coefficients, 2.0, &mut high);
        assert!(high[0] > low[0]);
    }
}
