//! Decision policies for turning model outputs into severity classes.
//!
//! These are the only places where model output is silently repaired, so
//! each one is a named type that tests can exercise directly.

/// Confidence reported when the deciding model exposes no probabilities.
pub const NO_PROBABILITY_CONFIDENCE: f64 = 0.75;

/// Stand-in for a non-finite ordinal regressor output (mid severity).
pub const ORDINAL_NON_FINITE_DEFAULT: f64 = 1.0;

/// Maps a continuous ordinal-regression output to a class label:
/// non-finite values become [`ORDINAL_NON_FINITE_DEFAULT`], then the value
/// is rounded and clamped into `[0, n_classes - 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClampOrdinalOutput {
    n_classes: usize,
}

impl ClampOrdinalOutput {
    #[must_use]
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes: n_classes.max(1),
        }
    }

    #[must_use]
    pub fn apply(&self, raw: f64) -> u8 {
        let value = if raw.is_finite() {
            raw
        } else {
            ORDINAL_NON_FINITE_DEFAULT
        };
        let max = (self.n_classes - 1) as f64;
        value.round().clamp(0.0, max) as u8
    }
}

/// Index of the largest finite probability; ties resolve to the lowest class.
#[must_use]
pub fn argmax(probabilities: &[f64]) -> Option<usize> {
    probabilities
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_finite())
        .fold(None, |best: Option<(usize, f64)>, (i, &p)| match best {
            Some((_, bp)) if bp >= p => best,
            _ => Some((i, p)),
        })
        .map(|(i, _)| i)
}

/// Clamp a probability into `[0, 1]`, treating non-finite values as 0.
#[must_use]
pub fn clamp_probability(p: f64) -> f64 {
    if p.is_finite() {
        p.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
