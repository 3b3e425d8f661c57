//! Per-drug 2x2 contingency tables against a reaction focus set.
//!
//! ```text
//!                     focus reaction   other reactions   sum
//! focus drug               n11               n12         n1p
//! other drugs              n21               n22         n2p
//! sum                      np1               np2         npp
//! ```

use std::{
    borrow::Cow,
    ops::Range,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    data::corpus::{count_in, intersect, Corpus, DrugId, FocusSet},
    error::{Result, SignalError},
};

/// The nine counts of one table. Signed so that integrated rows may carry
/// the arithmetic of overlapping members without wrapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContingencyCounts {
    pub n11: i64,
    pub n12: i64,
    pub n21: i64,
    pub n22: i64,
    pub n1p: i64,
    pub n2p: i64,
    pub np1: i64,
    pub np2: i64,
    pub npp: i64,
}

impl ContingencyCounts {
    /// Fill the table from `n11` and the margins it shares with the corpus.
    pub fn from_margins(n11: i64, n1p: i64, np1: i64, npp: i64) -> Self {
        let n12 = n1p - n11;
        let n21 = np1 - n11;
        let n2p = npp - n1p;
        Self {
            n11,
            n12,
            n21,
            n22: n2p - n21,
            n1p,
            n2p,
            np1,
            np2: npp - np1,
            npp,
        }
    }

    /// All marginal identities hold.
    pub fn is_consistent(&self) -> bool {
        self.n11 + self.n12 == self.n1p
            && self.n21 + self.n22 == self.n2p
            && self.n11 + self.n21 == self.np1
            && self.n12 + self.n22 == self.np2
            && self.n1p + self.n2p == self.npp
            && self.np1 + self.np2 == self.npp
    }

    /// Computed against the same corpus slice and focus set.
    pub fn same_scope(&self, other: &Self) -> bool {
        self.npp == other.npp && self.np1 == other.np1 && self.np2 == other.np2
    }
}

/// Counts for one candidate drug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingencyRow {
    pub drug: DrugId,
    pub counts: ContingencyCounts,
}

/// Which records a drug's table is counted over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    /// Every record in the corpus.
    #[default]
    WholeCorpus,
    /// Only dated records on or after the drug's market-entry boundary.
    MarketEntry,
}

/// Table-construction policy: a scope plus an optional confound drug whose
/// reports are removed before counting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub scope: Scope,
    pub exclude: Option<DrugId>,
}

impl Policy {
    pub fn whole_corpus() -> Self {
        Self::default()
    }

    pub fn time_boundary() -> Self {
        Self {
            scope: Scope::MarketEntry,
            exclude: None,
        }
    }

    pub fn drug_exclusion(confound: impl Into<DrugId>) -> Self {
        Self::whole_corpus().excluding(confound)
    }

    pub fn excluding(mut self, confound: impl Into<DrugId>) -> Self {
        self.exclude = Some(confound.into());
        self
    }
}

/// Cooperative cancellation flag shared with a running build.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Materialises contingency rows for candidate drugs.
#[derive(Debug)]
pub struct ContingencyBuilder<'a> {
    corpus: &'a Corpus,
    focus: &'a FocusSet,
    cancel: CancelToken,
}

impl<'a> ContingencyBuilder<'a> {
    pub fn new(corpus: &'a Corpus, focus: &'a FocusSet) -> Self {
        Self {
            corpus,
            focus,
            cancel: CancelToken::default(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Count tables for `candidates` (default: the corpus drug vocabulary).
    /// Drugs are processed on the rayon pool; row order follows the
    /// candidate order.
    pub fn build(
        &self,
        policy: &Policy,
        candidates: Option<&[DrugId]>,
    ) -> Result<Vec<ContingencyRow>> {
        let started = Instant::now();
        let corpus: Cow<'_, Corpus> = match &policy.exclude {
            Some(confound) => Cow::Owned(self.corpus.without_drug(confound)),
            None => Cow::Borrowed(self.corpus),
        };
        let drugs: Vec<DrugId> = match candidates {
            Some(list) => list.to_vec(),
            None => corpus.drugs().cloned().collect(),
        };
        let drugs: Vec<DrugId> = drugs
            .into_iter()
            .filter(|d| policy.exclude.as_ref() != Some(d))
            .collect();

        let focus = corpus.focus_postings(self.focus);
        if focus.is_empty() {
            warn!(
                terms = self.focus.len(),
                "focus set matches no records; statistics will be non-finite"
            );
        }

        let rows = drugs
            .par_iter()
            .map(|drug| {
                if self.cancel.is_cancelled() {
                    return Err(SignalError::Cancelled);
                }
                let range = match policy.scope {
                    Scope::WholeCorpus => 0..corpus.len(),
                    Scope::MarketEntry => corpus.market_entry_scope(drug),
                };
                Ok(ContingencyRow {
                    drug: drug.clone(),
                    counts: count_drug(&corpus, &focus, drug, &range),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            drugs = rows.len(),
            npp = corpus.len(),
            np1 = focus.len(),
            scope = ?policy.scope,
            exclude = ?policy.exclude,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "built contingency tables"
        );
        Ok(rows)
    }
}

fn count_drug(corpus: &Corpus, focus: &[u32], drug: &str, range: &Range<usize>) -> ContingencyCounts {
    let exposed = corpus.drug_postings(drug);
    let npp = range.len() as i64;
    let np1 = count_in(focus, range) as i64;
    let n1p = count_in(exposed, range) as i64;
    let n11 = count_in(&intersect(exposed, focus), range) as i64;
    if npp == 0 {
        debug!(drug, "empty corpus slice");
    }
    ContingencyCounts::from_margins(n11, n1p, np1, npp)
}
