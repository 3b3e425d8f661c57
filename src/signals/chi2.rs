//! Chi-square tests on 2x2 tables with family-wide p-value adjustment.

use statrs::function::erf::erfc;

/// Per-row test results plus their adjusted counterparts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChiSquare {
    pub chi2: Vec<f64>,
    pub p: Vec<f64>,
    pub q_bh: Vec<f64>,
    pub q_holm: Vec<f64>,
    pub alpha: f64,
}

impl ChiSquare {
    /// Rows still significant after Benjamini-Hochberg adjustment.
    pub fn discoveries_bh(&self) -> usize {
        self.q_bh.iter().filter(|q| **q <= self.alpha).count()
    }

    /// Rows still significant after Holm adjustment.
    pub fn discoveries_holm(&self) -> usize {
        self.q_holm.iter().filter(|q| **q <= self.alpha).count()
    }
}

/// Chi-square statistic of one table. With `yates`, each observed cell moves
/// toward its expectation by at most 0.5. A zero expected cell gives NaN.
pub fn statistic(n11: f64, n12: f64, n21: f64, n22: f64, yates: bool) -> f64 {
    let n = n11 + n12 + n21 + n22;
    let rows = [n11 + n12, n21 + n22];
    let cols = [n11 + n21, n12 + n22];
    let observed = [[n11, n12], [n21, n22]];

    let mut chi2 = 0.0;
    for (i, row) in rows.iter().enumerate() {
        for (j, col) in cols.iter().enumerate() {
            let expected = row * col / n;
            if expected.is_nan() || expected <= 0.0 {
                return f64::NAN;
            }
            let mut obs = observed[i][j];
            if yates {
                let diff = expected - obs;
                obs += diff.signum() * diff.abs().min(0.5);
            }
            chi2 += (obs - expected).powi(2) / expected;
        }
    }
    chi2
}

/// Upper-tail probability of a chi-square variate with one degree of freedom.
pub fn p_value(chi2: f64) -> f64 {
    erfc((chi2 / 2.0).sqrt())
}

/// Test every row, then adjust the complete p-value vector jointly.
pub fn chi_square_with_correction(
    n11: &[f64],
    n12: &[f64],
    n21: &[f64],
    n22: &[f64],
    alpha: f64,
    yates: bool,
) -> ChiSquare {
    let chi2: Vec<f64> = n11
        .iter()
        .zip(n12)
        .zip(n21)
        .zip(n22)
        .map(|(((a, b), c), d)| statistic(*a, *b, *c, *d, yates))
        .collect();
    let p: Vec<f64> = chi2.iter().map(|x| p_value(*x)).collect();
    let q_bh = benjamini_hochberg(&p);
    let q_holm = holm(&p);
    ChiSquare {
        chi2,
        p,
        q_bh,
        q_holm,
        alpha,
    }
}

/// Indices of finite p-values in ascending p order (ties keep input order).
fn ranked(p: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..p.len()).filter(|i| p[*i].is_finite()).collect();
    order.sort_by(|a, b| p[*a].total_cmp(&p[*b]));
    order
}

/// Benjamini-Hochberg step-up adjustment. Non-finite p-values are left out
/// of the family and come back as NaN.
pub fn benjamini_hochberg(p: &[f64]) -> Vec<f64> {
    let order = ranked(p);
    let m = order.len() as f64;
    let mut out = vec![f64::NAN; p.len()];
    let mut running = f64::INFINITY;
    for (rank, &idx) in order.iter().enumerate().rev() {
        running = running.min(p[idx] * m / (rank + 1) as f64);
        out[idx] = running.min(1.0);
    }
    out
}

/// Holm step-down adjustment. Non-finite p-values come back as NaN.
pub fn holm(p: &[f64]) -> Vec<f64> {
    let order = ranked(p);
    let m = order.len();
    let mut out = vec![f64::NAN; p.len()];
    let mut running = 0.0_f64;
    for (rank, &idx) in order.iter().enumerate() {
        running = running.max(p[idx] * (m - rank) as f64);
        out[idx] = running.min(1.0);
    }
    out
}
