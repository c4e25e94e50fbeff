//! Exponential moving average smoothing

/// Single-value exponential moving average
///
/// The first observation initializes the filter without blending. `alpha` is
/// taken as given: 0 freezes the filter at the first value, 1 passes raw
/// values through.
#[derive(Debug, Clone)]
pub struct Smoother {
    alpha: f64,
    value: Option<f64>,
}

impl Smoother {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, value: None }
    }

    /// Feed a raw sample and get the smoothed value
    pub fn update(&mut self, raw: f64) -> f64 {
        let next = match self.value {
            None => raw,
            Some(prev) => self.alpha * raw + (1.0 - self.alpha) * prev,
        };
        self.value = Some(next);
        next
    }

    /// Current smoothed value, `None` before the first sample
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_sample_is_not_blended() {
        let mut smoother = Smoother::new(0.3);
        assert_eq!(smoother.value(), None);
        assert_eq!(smoother.update(-12.5), -12.5);
        assert_eq!(smoother.value(), Some(-12.5));
    }

    #[test]
    fn test_blending() {
        let mut smoother = Smoother::new(0.25);
        smoother.update(0.0);
        assert!((smoother.update(4.0) - 1.0).abs() < 1e-12);
        assert!((smoother.update(4.0) - 1.75).abs() < 1e-12);
    }

    #[test]
    fn test_alpha_one_passes_through() {
        let mut smoother = Smoother::new(1.0);
        for raw in [0.3, 0.9, -4.0, 0.18] {
            assert_eq!(smoother.update(raw), raw);
        }
    }

    #[test]
    fn test_reset() {
        let mut smoother = Smoother::new(0.5);
        smoother.update(10.0);
        smoother.reset();
        assert_eq!(smoother.update(2.0), 2.0);
    }

    proptest! {
        #[test]
        fn test_alpha_zero_freezes(first in -1e6f64..1e6, rest in prop::collection::vec(-1e6f64..1e6, 0..32)) {
            let mut smoother = Smoother::new(0.0);
            smoother.update(first);
            for raw in rest {
                prop_assert_eq!(smoother.update(raw), first);
            }
        }

        #[test]
        fn test_output_stays_within_observed_range(samples in prop::collection::vec(-1e3f64..1e3, 1..32), alpha in 0.0f64..=1.0) {
            let mut smoother = Smoother::new(alpha);
            let lo = samples.iter().cloned().fold(f64::MAX, f64::min);
            let hi = samples.iter().cloned().fold(f64::MIN, f64::max);
            for raw in samples {
                let value = smoother.update(raw);
                prop_assert!(value >= lo - 1e-9 && value <= hi + 1e-9);
            }
        }
    }
}
