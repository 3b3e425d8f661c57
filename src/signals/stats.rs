//! Statistics kernel: derived columns for a batch of contingency tables.
//!
//! Every function here is pure and works on parallel columns, one element
//! per drug row.

use serde::{Deserialize, Serialize};

pub use super::bayes::information_component_lower_bound;
pub use super::chi2::{benjamini_hochberg, chi_square_with_correction, holm, ChiSquare};
pub use super::ror::{confidence_interval, ror, Z_95};

use super::contingency::ContingencyCounts;

/// Knobs for the derived-statistics pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsOptions {
    /// z for the ROR confidence interval.
    pub z: f64,
    /// Family-wise level used to report discoveries.
    pub alpha: f64,
    /// Apply Yates' continuity correction to the chi-square statistic.
    pub yates: bool,
    pub chi_square: bool,
    pub information_component: bool,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            z: Z_95,
            alpha: 0.05,
            yates: true,
            chi_square: true,
            information_component: true,
        }
    }
}

/// Count columns as `f64`, in row order.
#[derive(Debug, Clone, Default)]
pub struct Cells {
    pub n11: Vec<f64>,
    pub n12: Vec<f64>,
    pub n21: Vec<f64>,
    pub n22: Vec<f64>,
}

impl<'a> FromIterator<&'a ContingencyCounts> for Cells {
    fn from_iter<T: IntoIterator<Item = &'a ContingencyCounts>>(iter: T) -> Self {
        let mut cells = Cells::default();
        for counts in iter {
            cells.n11.push(counts.n11 as f64);
            cells.n12.push(counts.n12 as f64);
            cells.n21.push(counts.n21 as f64);
            cells.n22.push(counts.n22 as f64);
        }
        cells
    }
}

/// Derived statistics aligned with the input rows.
#[derive(Debug, Clone, Default)]
pub struct Derived {
    pub ror: Vec<f64>,
    pub lower_ci: Vec<f64>,
    pub upper_ci: Vec<f64>,
    pub chi_square: Option<ChiSquare>,
    pub ic_lower: Option<Vec<f64>>,
}

/// Run the kernel over `cells`. Chi-square adjustment sees all rows at once.
pub fn derive(cells: &Cells, options: &StatsOptions) -> Derived {
    let Cells { n11, n12, n21, n22 } = cells;
    let ror = ror(n11, n12, n21, n22);
    let (lower_ci, upper_ci) = confidence_interval(n11, n12, n21, n22, options.z);
    let chi_square = options
        .chi_square
        .then(|| chi_square_with_correction(n11, n12, n21, n22, options.alpha, options.yates));
    let ic_lower = options
        .information_component
        .then(|| information_component_lower_bound(n11, n12, n21, n22));
    Derived {
        ror,
        lower_ci,
        upper_ci,
        chi_square,
        ic_lower,
    }
}
