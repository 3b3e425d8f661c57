//! Error taxonomy for the signal-detection core.
//!
//! Numerical degeneracy (zero cells, empty focus intersections) is not
//! represented here: it travels as non-finite `f64` values in result rows.

use thiserror::Error;

/// Failures surfaced by the core computation and its collaborators.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Focus-set criteria resolved to no reaction identities.
    #[error("reaction criteria {criteria} resolved to no terms; check the category names")]
    EmptyFocus { criteria: String },

    /// A MedDRA layer outside `{SOC, HLGT, HLT, PT}`.
    #[error("unknown MedDRA layer `{0}` (expected one of SOC, HLGT, HLT, PT)")]
    UnknownLayer(String),

    /// Integration was asked to merge fewer than two drugs.
    #[error("integration needs at least 2 drugs, got {given}")]
    TooFewDrugs { given: usize },

    /// A row name would no longer be unique.
    #[error("drug `{0}` already exists in the signal table")]
    DuplicateDrug(String),

    /// Rows computed against different corpus scopes cannot be merged.
    #[error("cannot integrate `{drug}`: its corpus scope differs from `{reference}`")]
    IncompatibleScopes { drug: String, reference: String },

    /// A case record violates the corpus admission invariants.
    #[error("case `{case_id}` rejected: {reason}")]
    InvalidRecord { case_id: String, reason: String },

    /// No dictionary entry matches a requested drug name.
    #[error("no drug matches `{name}`{}", suggestion.as_ref().map(|s| format!(" (did you mean `{s}`?)")).unwrap_or_default())]
    UnknownDrug {
        name: String,
        suggestion: Option<String>,
    },

    /// A drug identity has no representative name for display.
    #[error("drug identity `{0}` has no representative name")]
    MissingDecoding(String),

    /// A sort key outside the exported column set.
    #[error("unknown sort key `{0}`")]
    UnknownSortKey(String),

    /// The run was abandoned before the table was published.
    #[error("signal computation cancelled")]
    Cancelled,
}

/// Convenience alias used across the core.
pub type Result<T> = std::result::Result<T, SignalError>;
