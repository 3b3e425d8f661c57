//! Shared DTOs for JSON responses.

use serde::{Deserialize, Serialize};

/// One exported signal row. Non-finite statistics serialise as `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalDto {
    pub drug: String,
    pub n11: i64,
    pub n12: i64,
    pub n21: i64,
    pub n22: i64,
    pub n1p: i64,
    pub n2p: i64,
    pub np1: i64,
    pub np2: i64,
    pub npp: i64,
    #[serde(rename = "ROR")]
    pub ror: f64,
    #[serde(rename = "lower_CI")]
    pub lower_ci: f64,
    #[serde(rename = "upper_CI")]
    pub upper_ci: f64,
    pub chi_square: Option<f64>,
    pub p_value: Option<f64>,
    #[serde(rename = "q_BH")]
    pub q_bh: Option<f64>,
    #[serde(rename = "q_Holm")]
    pub q_holm: Option<f64>,
    #[serde(rename = "IC_lowerCI")]
    pub ic_lower: Option<f64>,
}

impl SignalDto {
    pub fn is_finite(&self) -> bool {
        self.ror.is_finite() && self.lower_ci.is_finite() && self.upper_ci.is_finite()
    }
}
