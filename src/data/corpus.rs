//! In-memory case corpus with inverted drug/reaction indices.
//!
//! Records are held in chronological order (undated records last) so that a
//! market-entry slice is a contiguous range of record positions and every
//! count against it reduces to a binary search over a sorted postings list.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    ops::Range,
};

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, SignalError};

/// Normalised drug identity token.
pub type DrugId = String;
/// Reaction identity token (post MedDRA mapping).
pub type ReactionId = String;

/// Canonical spelling of a reaction identity: trimmed and lowercased, so case
/// rows and MedDRA rows agree on the same key.
pub fn reaction_key(raw: &str) -> ReactionId {
    raw.trim().to_lowercase()
}

/// One adverse-event report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub case_id: String,
    pub drugs: BTreeSet<DrugId>,
    pub reactions: BTreeSet<ReactionId>,
    /// `None` when the report carries no usable event date.
    pub event_date: Option<NaiveDate>,
    /// Reporter qualification code, when known.
    pub qualification: Option<u8>,
}

impl CaseRecord {
    pub fn new<D, R>(
        case_id: impl Into<String>,
        drugs: impl IntoIterator<Item = D>,
        reactions: impl IntoIterator<Item = R>,
        event_date: Option<NaiveDate>,
    ) -> Self
    where
        D: Into<DrugId>,
        R: Into<ReactionId>,
    {
        Self {
            case_id: case_id.into(),
            drugs: drugs.into_iter().map(Into::into).collect(),
            reactions: reactions.into_iter().map(Into::into).collect(),
            event_date,
            qualification: None,
        }
    }

    pub fn with_qualification(mut self, qualification: u8) -> Self {
        self.qualification = Some(qualification);
        self
    }

    pub fn has_drug(&self, drug: &str) -> bool {
        self.drugs.contains(drug)
    }
}

/// Reaction identities under investigation for one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusSet(BTreeSet<ReactionId>);

impl FocusSet {
    pub fn new<R: Into<ReactionId>>(terms: impl IntoIterator<Item = R>) -> Self {
        Self(terms.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.0.contains(term)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReactionId> {
        self.0.iter()
    }
}

impl<R: Into<ReactionId>> FromIterator<R> for FocusSet {
    fn from_iter<T: IntoIterator<Item = R>>(iter: T) -> Self {
        Self::new(iter)
    }
}

/// Sorted distinct event dates with the position of each date's first record.
#[derive(Debug, Clone, Default)]
pub struct DateIndex {
    dates: Vec<NaiveDate>,
    starts: Vec<usize>,
    end: usize,
}

impl DateIndex {
    fn from_sorted(records: &[CaseRecord]) -> Self {
        let mut index = Self::default();
        for (pos, record) in records.iter().enumerate() {
            let Some(date) = record.event_date else {
                break;
            };
            if index.dates.last() != Some(&date) {
                index.dates.push(date);
                index.starts.push(pos);
            }
            index.end = pos + 1;
        }
        index
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn earliest(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn latest(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Earliest corpus date not preceding `entry`; the latest corpus date when
    /// `entry` is after every record. `None` only when nothing is dated.
    pub fn resolve_boundary(&self, entry: NaiveDate) -> Option<NaiveDate> {
        let idx = self.dates.partition_point(|d| *d < entry);
        self.dates.get(idx).or_else(|| self.dates.last()).copied()
    }

    /// Record positions dated on or after `boundary`.
    pub fn range_from(&self, boundary: NaiveDate) -> Range<usize> {
        let idx = self.dates.partition_point(|d| *d < boundary);
        let start = self.starts.get(idx).copied().unwrap_or(self.end);
        start..self.end
    }
}

/// Read-only collection of case records plus the indices built over it.
#[derive(Debug, Clone)]
pub struct Corpus {
    records: Vec<CaseRecord>,
    drug_index: BTreeMap<DrugId, Vec<u32>>,
    reaction_index: HashMap<ReactionId, Vec<u32>>,
    dates: DateIndex,
    first_seen: HashMap<DrugId, NaiveDate>,
}

impl Corpus {
    /// Admit `records`, rejecting empty drug/reaction sets and repeated ids.
    pub fn new(mut records: Vec<CaseRecord>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if record.drugs.is_empty() {
                return Err(invalid(record, "no drugs"));
            }
            if record.reactions.is_empty() {
                return Err(invalid(record, "no reactions"));
            }
            if !seen.insert(record.case_id.as_str()) {
                return Err(invalid(record, "duplicate case id"));
            }
        }
        // stable: equal dates keep provider order
        records.sort_by_key(|r| (r.event_date.is_none(), r.event_date));
        let first_seen = derive_first_seen(&records);
        Ok(Self::index(records, first_seen))
    }

    fn index(records: Vec<CaseRecord>, first_seen: HashMap<DrugId, NaiveDate>) -> Self {
        let mut drug_index: BTreeMap<DrugId, Vec<u32>> = BTreeMap::new();
        let mut reaction_index: HashMap<ReactionId, Vec<u32>> = HashMap::new();
        for (pos, record) in records.iter().enumerate() {
            let pos = pos as u32;
            for drug in &record.drugs {
                drug_index.entry(drug.clone()).or_default().push(pos);
            }
            for reaction in &record.reactions {
                reaction_index.entry(reaction.clone()).or_default().push(pos);
            }
        }
        let dates = DateIndex::from_sorted(&records);
        debug!(
            records = records.len(),
            drugs = drug_index.len(),
            reactions = reaction_index.len(),
            dates = dates.dates.len(),
            "indexed corpus"
        );
        Self {
            records,
            drug_index,
            reaction_index,
            dates,
            first_seen,
        }
    }

    /// Override first-occurrence dates with provider-supplied values.
    pub fn with_first_occurrence(
        mut self,
        entries: impl IntoIterator<Item = (DrugId, NaiveDate)>,
    ) -> Self {
        self.first_seen.extend(entries);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records carrying an event date.
    pub fn dated_len(&self) -> usize {
        self.dates.end
    }

    pub fn record(&self, pos: usize) -> Option<&CaseRecord> {
        self.records.get(pos)
    }

    pub fn records(&self) -> &[CaseRecord] {
        &self.records
    }

    /// Drug vocabulary in sorted order.
    pub fn drugs(&self) -> impl Iterator<Item = &DrugId> {
        self.drug_index.keys()
    }

    pub fn contains_drug(&self, drug: &str) -> bool {
        self.drug_index.contains_key(drug)
    }

    pub fn drug_postings(&self, drug: &str) -> &[u32] {
        self.drug_index.get(drug).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn reaction_postings(&self, reaction: &str) -> &[u32] {
        self.reaction_index
            .get(reaction)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Positions of records reporting any reaction in `focus`.
    pub fn focus_postings(&self, focus: &FocusSet) -> Vec<u32> {
        let mut out: Vec<u32> = focus
            .iter()
            .flat_map(|term| self.reaction_postings(term).iter().copied())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn date_index(&self) -> &DateIndex {
        &self.dates
    }

    pub fn first_occurrence(&self, drug: &str) -> Option<NaiveDate> {
        self.first_seen.get(drug).copied()
    }

    /// Record range comparable with `drug` after its market entry. Falls back
    /// to the whole corpus when the drug has no entry date or nothing is dated.
    pub fn market_entry_scope(&self, drug: &str) -> Range<usize> {
        self.first_occurrence(drug)
            .and_then(|entry| self.dates.resolve_boundary(entry))
            .map(|boundary| self.dates.range_from(boundary))
            .unwrap_or(0..self.records.len())
    }

    /// Copy of the corpus keeping records matching `keep`. First-occurrence
    /// dates carry over unchanged.
    pub fn filtered(&self, keep: impl Fn(&CaseRecord) -> bool) -> Self {
        let records: Vec<CaseRecord> = self.records.iter().filter(|r| keep(r)).cloned().collect();
        Self::index(records, self.first_seen.clone())
    }

    /// Corpus with every record mentioning `drug` removed.
    pub fn without_drug(&self, drug: &str) -> Self {
        let reduced = self.filtered(|r| !r.has_drug(drug));
        debug!(
            drug,
            before = self.len(),
            after = reduced.len(),
            "removed confound drug"
        );
        reduced
    }

    /// Corpus narrowed to reports whose reporter qualification is at least `min`.
    pub fn retain_qualified(&self, min: u8) -> Self {
        self.filtered(|r| r.qualification.is_some_and(|q| q >= min))
    }
}

fn invalid(record: &CaseRecord, reason: &str) -> SignalError {
    SignalError::InvalidRecord {
        case_id: record.case_id.clone(),
        reason: reason.to_string(),
    }
}

fn derive_first_seen(sorted: &[CaseRecord]) -> HashMap<DrugId, NaiveDate> {
    let mut first = HashMap::new();
    for record in sorted {
        let Some(date) = record.event_date else {
            break;
        };
        for drug in &record.drugs {
            first.entry(drug.clone()).or_insert(date);
        }
    }
    first
}

/// Positions present in both sorted lists.
pub fn intersect(a: &[u32], b: &[u32]) -> Vec<u32> {
    let (mut i, mut j) = (0, 0);
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Count of sorted positions falling inside `range`.
pub fn count_in(postings: &[u32], range: &Range<usize>) -> u64 {
    let lo = postings.partition_point(|&p| (p as usize) < range.start);
    let hi = postings.partition_point(|&p| (p as usize) < range.end);
    (hi - lo) as u64
}

/// Accumulates long-format rows (one drug or reaction per row) into case
/// records, the shape relational and tabular providers deliver.
#[derive(Debug, Default)]
pub struct CorpusBuilder {
    cases: IndexMap<String, CaseRecord>,
    first_seen: Vec<(DrugId, NaiveDate)>,
}

impl CorpusBuilder {
    fn case(&mut self, case_id: &str) -> &mut CaseRecord {
        self.cases
            .entry(case_id.to_string())
            .or_insert_with(|| CaseRecord {
                case_id: case_id.to_string(),
                drugs: BTreeSet::new(),
                reactions: BTreeSet::new(),
                event_date: None,
                qualification: None,
            })
    }

    pub fn add_drug(&mut self, case_id: &str, drug: impl Into<DrugId>) -> &mut Self {
        self.case(case_id).drugs.insert(drug.into());
        self
    }

    pub fn add_reaction(&mut self, case_id: &str, reaction: impl AsRef<str>) -> &mut Self {
        self.case(case_id)
            .reactions
            .insert(reaction_key(reaction.as_ref()));
        self
    }

    pub fn set_event_date(&mut self, case_id: &str, date: Option<NaiveDate>) -> &mut Self {
        if date.is_some() {
            self.case(case_id).event_date = date;
        }
        self
    }

    pub fn set_qualification(&mut self, case_id: &str, qualification: Option<u8>) -> &mut Self {
        if qualification.is_some() {
            self.case(case_id).qualification = qualification;
        }
        self
    }

    pub fn first_occurrence(&mut self, drug: impl Into<DrugId>, date: NaiveDate) -> &mut Self {
        self.first_seen.push((drug.into(), date));
        self
    }

    /// Finish the corpus, skipping cases that lack drugs or reactions.
    pub fn build(self) -> Result<Corpus> {
        let total = self.cases.len();
        let records: Vec<CaseRecord> = self
            .cases
            .into_values()
            .filter(|r| !r.drugs.is_empty() && !r.reactions.is_empty())
            .collect();
        if records.len() < total {
            warn!(
                skipped = total - records.len(),
                "dropped cases without drugs or reactions"
            );
        }
        Ok(Corpus::new(records)?.with_first_occurrence(self.first_seen))
    }
}
