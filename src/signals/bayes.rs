//! Empirical Bayes Information Component (IC).
//!
//! The IC is a shrunk log2 ratio of observed to expected co-occurrence; a
//! positive lower bound marks a reliable excess of reports.

use std::f64::consts::LN_2;

/// Prior pseudo-counts of the shrinkage estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prior {
    pub a: f64,
    pub b: f64,
    pub a1: f64,
    pub b1: f64,
    pub r11: f64,
}

impl Default for Prior {
    fn default() -> Self {
        Self {
            a: 2.0,
            b: 2.0,
            a1: 1.0,
            b1: 1.0,
            r11: 1.0,
        }
    }
}

/// Posterior expectation and variance of the IC for one table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IcEstimate {
    pub expected: f64,
    pub variance: f64,
}

impl IcEstimate {
    /// Two-standard-deviation lower bound.
    pub fn lower_bound(&self) -> f64 {
        self.expected - 2.0 * self.variance.sqrt()
    }
}

/// Estimate the IC from the four cells of a 2x2 table.
pub fn estimate(n11: f64, n12: f64, n21: f64, n22: f64, prior: Prior) -> IcEstimate {
    let Prior { a, b, a1, b1, r11 } = prior;
    let n1p = n11 + n12;
    let np1 = n11 + n21;
    let npp = n1p + n21 + n22;

    let r = r11 * (npp + a) * (npp + b) / ((n1p + a1) * (n1p + b1));
    let expected = ((n11 + r11) * (npp + a) * (npp + b) / ((npp + r) * (n1p + a1) * (np1 + b1)))
        .log2();

    let spread = (npp - n11 + r - r11) / ((n11 + r11) * (1.0 + npp + r))
        + (npp - np1 + a - a1) / ((n1p + a1) * (1.0 + npp + a))
        + (npp - np1 + b - b1) / ((np1 + b1) * (1.0 + npp + b));
    let variance = spread / (LN_2 * LN_2);

    IcEstimate { expected, variance }
}

/// Element-wise IC lower bound with the default prior.
pub fn information_component_lower_bound(
    n11: &[f64],
    n12: &[f64],
    n21: &[f64],
    n22: &[f64],
) -> Vec<f64> {
    let prior = Prior::default();
    n11.iter()
        .zip(n12)
        .zip(n21)
        .zip(n22)
        .map(|(((a, b), c), d)| estimate(*a, *b, *c, *d, prior).lower_bound())
        .collect()
}
