//! Analysis entry point: focus selection, table construction, statistics.

use tracing::{info, instrument};

use crate::{
    data::{
        corpus::{Corpus, DrugId, FocusSet},
        meddra::{ReactionCriteria, ReactionResolver},
    },
    error::Result,
    signals::{
        contingency::{CancelToken, ContingencyBuilder, Policy},
        stats::StatsOptions,
        table::SignalTable,
    },
};

/// Wires a reaction resolver to the contingency builder and the kernel.
pub struct SignalAnalysis<'r, R: ReactionResolver + ?Sized> {
    resolver: &'r R,
    options: StatsOptions,
    candidates: Option<Vec<DrugId>>,
    cancel: CancelToken,
}

impl<'r, R: ReactionResolver + ?Sized> SignalAnalysis<'r, R> {
    pub fn new(resolver: &'r R) -> Self {
        Self {
            resolver,
            options: StatsOptions::default(),
            candidates: None,
            cancel: CancelToken::default(),
        }
    }

    pub fn with_options(mut self, options: StatsOptions) -> Self {
        self.options = options;
        self
    }

    /// Restrict runs to these drug identities instead of the whole vocabulary.
    pub fn with_candidates(mut self, candidates: impl IntoIterator<Item = DrugId>) -> Self {
        self.candidates = Some(candidates.into_iter().collect());
        self
    }

    pub fn with_cancellation(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Resolve a category into reaction identities; an empty resolution is an
    /// error rather than a vacuous focus set.
    pub fn select_reactions(&self, criteria: &ReactionCriteria) -> Result<FocusSet> {
        self.resolver.resolve(criteria)
    }

    /// Build, derive and sort the signal table for `focus` under `policy`.
    /// `drug_exclusion` is folded into the policy's confound drug.
    #[instrument(skip_all, fields(records = corpus.len(), focus = focus.len()))]
    pub fn run(
        &self,
        corpus: &Corpus,
        focus: &FocusSet,
        policy: &Policy,
        drug_exclusion: Option<&str>,
    ) -> Result<SignalTable> {
        let policy = match drug_exclusion {
            Some(confound) => policy.clone().excluding(confound),
            None => policy.clone(),
        };
        let rows = ContingencyBuilder::new(corpus, focus)
            .with_cancellation(self.cancel.clone())
            .build(&policy, self.candidates.as_deref())?;
        let table = SignalTable::build(rows, self.options)?;
        info!(rows = table.len(), "signal table ready");
        Ok(table)
    }
}
