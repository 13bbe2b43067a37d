//! Blend of field A and the optional field B into one grayscale value.

use crate::config::MixStrategy;

/// Stateless mixer; each output depends only on its own two inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FieldMixer {
    strategy: MixStrategy,
}

impl FieldMixer {
    pub fn new(strategy: MixStrategy) -> Self {
        Self { strategy }
    }

    #[inline]
    pub fn strategy(&self) -> MixStrategy {
        self.strategy
    }

    /// Returns `a` unchanged when field B is absent.
    #[inline]
    pub fn mix(&self, a: f64, b: Option<f64>) -> f64 {
        let Some(b) = b else {
            return a;
        };
        let v = match self.strategy {
            MixStrategy::Average => 0.5 * (a + b),
            MixStrategy::Weighted { weight_b } => {
                let w = weight_b.clamp(0.0, 1.0);
                (1.0 - w) * a + w * b
            }
        };
        v.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_and_weighted() {
        let avg = FieldMixer::new(MixStrategy::Average);
        assert!((avg.mix(0.2, Some(0.6)) - 0.4).abs() < 1e-12);

        let w = FieldMixer::new(MixStrategy::Weighted { weight_b: 0.25 });
        assert!((w.mix(0.0, Some(1.0)) - 0.25).abs() < 1e-12);
        let all_b = FieldMixer::new(MixStrategy::Weighted { weight_b: 1.0 });
        assert_eq!(all_b.mix(0.3, Some(0.9)), 0.9);
    }

    #[test]
    fn missing_b_passes_a_through() {
        let w = FieldMixer::new(MixStrategy::Weighted { weight_b: 0.8 });
        assert_eq!(w.mix(0.123, None), 0.123);
    }
}
