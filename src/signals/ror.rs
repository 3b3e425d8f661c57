//! Reporting odds ratio computations.
//!
//! No continuity correction is applied: a zero cell yields an infinite or
//! NaN ratio, which callers read as "not enough data".

/// z for a two-sided 95% interval.
pub const Z_95: f64 = 1.96;

/// `(n11 * n22) / (n12 * n21)` for one table.
pub fn ror_value(n11: f64, n12: f64, n21: f64, n22: f64) -> f64 {
    (n11 * n22) / (n12 * n21)
}

/// Standard error of `ln(ROR)`.
pub fn log_se(n11: f64, n12: f64, n21: f64, n22: f64) -> f64 {
    (1.0 / n11 + 1.0 / n12 + 1.0 / n21 + 1.0 / n22).sqrt()
}

/// Log-normal interval `exp(ln(ROR) ± z * se)` for one table.
pub fn ci_value(n11: f64, n12: f64, n21: f64, n22: f64, z: f64) -> (f64, f64) {
    let log_ror = ror_value(n11, n12, n21, n22).ln();
    let half_width = z * log_se(n11, n12, n21, n22);
    ((log_ror - half_width).exp(), (log_ror + half_width).exp())
}

/// Element-wise ROR over parallel count columns.
pub fn ror(n11: &[f64], n12: &[f64], n21: &[f64], n22: &[f64]) -> Vec<f64> {
    debug_assert!(n11.len() == n12.len() && n12.len() == n21.len() && n21.len() == n22.len());
    n11.iter()
        .zip(n12)
        .zip(n21)
        .zip(n22)
        .map(|(((a, b), c), d)| ror_value(*a, *b, *c, *d))
        .collect()
}

/// Element-wise `(lower, upper)` confidence bounds.
pub fn confidence_interval(
    n11: &[f64],
    n12: &[f64],
    n21: &[f64],
    n22: &[f64],
    z: f64,
) -> (Vec<f64>, Vec<f64>) {
    n11.iter()
        .zip(n12)
        .zip(n21)
        .zip(n22)
        .map(|(((a, b), c), d)| ci_value(*a, *b, *c, *d, z))
        .unzip()
}
