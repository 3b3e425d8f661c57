//! Signal table: one row per drug identity with counts and derived statistics.

use std::{cmp::Ordering, fs::File, path::Path, str::FromStr};

use anyhow::Context;
use indexmap::IndexMap;
use polars::prelude::{
    CsvWriter, DataFrame, NamedFrom, ParquetWriter, PolarsResult, SerWriter, Series,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    data::{corpus::DrugId, dictionary::DrugDictionary},
    error::{Result, SignalError},
    signals::{
        contingency::{ContingencyCounts, ContingencyRow},
        stats::{self, Cells, StatsOptions},
    },
};

/// Name given to an integrated row when the caller supplies none.
pub const DEFAULT_INTEGRATED_NAME: &str = "integrated_drug";

/// Export column order.
pub const COLUMNS: [&str; 18] = [
    "drug",
    "n11",
    "n12",
    "n21",
    "n22",
    "n1p",
    "n2p",
    "np1",
    "np2",
    "npp",
    "ROR",
    "lower_CI",
    "upper_CI",
    "chi_square",
    "p_value",
    "q_BH",
    "q_Holm",
    "IC_lowerCI",
];

/// One drug's counts and statistics. Optional fields are `None` when the
/// corresponding test was switched off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    pub drug: DrugId,
    pub counts: ContingencyCounts,
    pub ror: f64,
    pub lower_ci: f64,
    pub upper_ci: f64,
    pub chi_square: Option<f64>,
    pub p_value: Option<f64>,
    pub q_bh: Option<f64>,
    pub q_holm: Option<f64>,
    pub ic_lower: Option<f64>,
}

impl SignalRow {
    fn placeholder(row: ContingencyRow) -> Self {
        Self {
            drug: row.drug,
            counts: row.counts,
            ror: f64::NAN,
            lower_ci: f64::NAN,
            upper_ci: f64::NAN,
            chi_square: None,
            p_value: None,
            q_bh: None,
            q_holm: None,
            ic_lower: None,
        }
    }

    /// ROR and both interval bounds are finite.
    pub fn is_finite(&self) -> bool {
        self.ror.is_finite() && self.lower_ci.is_finite() && self.upper_ci.is_finite()
    }

    fn value(&self, key: SortKey) -> f64 {
        match key {
            SortKey::LowerCi => self.lower_ci,
            SortKey::UpperCi => self.upper_ci,
            SortKey::Ror => self.ror,
            SortKey::ChiSquare => self.chi_square.unwrap_or(f64::NAN),
            SortKey::PValue => self.p_value.unwrap_or(f64::NAN),
            SortKey::QBh => self.q_bh.unwrap_or(f64::NAN),
            SortKey::QHolm => self.q_holm.unwrap_or(f64::NAN),
            SortKey::IcLower => self.ic_lower.unwrap_or(f64::NAN),
            SortKey::N11 => self.counts.n11 as f64,
            SortKey::N1p => self.counts.n1p as f64,
            SortKey::Drug => f64::NAN,
        }
    }
}

/// Column a table can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    LowerCi,
    UpperCi,
    Ror,
    ChiSquare,
    PValue,
    QBh,
    QHolm,
    IcLower,
    N11,
    N1p,
    Drug,
}

impl FromStr for SortKey {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self> {
        let key = match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "lower_ci" => SortKey::LowerCi,
            "upper_ci" => SortKey::UpperCi,
            "ror" => SortKey::Ror,
            "chi_square" => SortKey::ChiSquare,
            "p_value" => SortKey::PValue,
            "q_bh" => SortKey::QBh,
            "q_holm" => SortKey::QHolm,
            "ic_lowerci" | "ic_lower" | "ic" => SortKey::IcLower,
            "n11" => SortKey::N11,
            "n1p" => SortKey::N1p,
            "drug" => SortKey::Drug,
            _ => return Err(SignalError::UnknownSortKey(s.to_string())),
        };
        Ok(key)
    }
}

/// Drug rows keyed by identity, kept in presentation order.
#[derive(Debug, Clone, Default)]
pub struct SignalTable {
    rows: IndexMap<DrugId, SignalRow>,
    options: StatsOptions,
}

impl SignalTable {
    /// Attach statistics to builder output and order by descending lower CI.
    pub fn build(rows: Vec<ContingencyRow>, options: StatsOptions) -> Result<Self> {
        let mut map = IndexMap::with_capacity(rows.len());
        for row in rows {
            if map.contains_key(&row.drug) {
                return Err(SignalError::DuplicateDrug(row.drug));
            }
            map.insert(row.drug.clone(), SignalRow::placeholder(row));
        }
        let mut table = Self { rows: map, options };
        table.recompute();
        Ok(table.to_sorted(SortKey::LowerCi, false))
    }

    fn recompute(&mut self) {
        let cells: Cells = self.rows.values().map(|r| &r.counts).collect();
        let derived = stats::derive(&cells, &self.options);
        for (idx, row) in self.rows.values_mut().enumerate() {
            row.ror = derived.ror[idx];
            row.lower_ci = derived.lower_ci[idx];
            row.upper_ci = derived.upper_ci[idx];
            row.chi_square = derived.chi_square.as_ref().map(|c| c.chi2[idx]);
            row.p_value = derived.chi_square.as_ref().map(|c| c.p[idx]);
            row.q_bh = derived.chi_square.as_ref().map(|c| c.q_bh[idx]);
            row.q_holm = derived.chi_square.as_ref().map(|c| c.q_holm[idx]);
            row.ic_lower = derived.ic_lower.as_ref().map(|ic| ic[idx]);
        }
        if let Some(chi) = &derived.chi_square {
            info!(
                rows = self.rows.len(),
                bh = chi.discoveries_bh(),
                holm = chi.discoveries_holm(),
                alpha = chi.alpha,
                "derived signal statistics"
            );
        }
    }

    /// Merge the rows of `drug_ids` into one row called `name` and re-derive
    /// statistics for the whole table. Fewer than two of the ids being present
    /// leaves the table untouched.
    pub fn integrate<S: AsRef<str>>(mut self, name: &str, drug_ids: &[S]) -> Result<Self> {
        if drug_ids.len() < 2 {
            return Err(SignalError::TooFewDrugs {
                given: drug_ids.len(),
            });
        }
        let name = if name.is_empty() {
            DEFAULT_INTEGRATED_NAME
        } else {
            name
        };
        let mut members: Vec<&str> = Vec::new();
        for id in drug_ids {
            let id = id.as_ref();
            if self.rows.contains_key(id) && !members.contains(&id) {
                members.push(id);
            }
        }
        if members.len() < 2 {
            warn!(
                name,
                present = members.len(),
                "no integration: fewer than two of the drugs are in the table"
            );
            return Ok(self);
        }
        if self.rows.contains_key(name) && !members.contains(&name) {
            return Err(SignalError::DuplicateDrug(name.to_string()));
        }

        let reference = &self.rows[members[0]];
        let base = reference.counts;
        let (mut n1p, mut n11, mut n12) = (0, 0, 0);
        for id in &members {
            let counts = self.rows[*id].counts;
            if !counts.same_scope(&base) {
                return Err(SignalError::IncompatibleScopes {
                    drug: (*id).to_string(),
                    reference: reference.drug.clone(),
                });
            }
            n1p += counts.n1p;
            n11 += counts.n11;
            n12 += counts.n12;
        }
        let n21 = base.np1 - n11;
        let merged = ContingencyCounts {
            n11,
            n12,
            n21,
            n22: base.np2 - n12,
            n1p,
            n2p: base.npp - n1p,
            np1: base.np1,
            np2: base.np2,
            npp: base.npp,
        };

        let members: Vec<String> = members.into_iter().map(str::to_string).collect();
        for id in &members {
            self.rows.shift_remove(id.as_str());
        }
        self.rows.insert(
            name.to_string(),
            SignalRow::placeholder(ContingencyRow {
                drug: name.to_string(),
                counts: merged,
            }),
        );
        info!(name, members = ?members, "integrated drugs");
        self.recompute();
        Ok(self.to_sorted(SortKey::LowerCi, false))
    }

    /// Stable reorder by `key`; NaN values sort last in either direction.
    pub fn to_sorted(mut self, key: SortKey, ascending: bool) -> Self {
        self.rows.sort_by(|_, a, _, b| {
            if key == SortKey::Drug {
                let ord = a.drug.cmp(&b.drug);
                return if ascending { ord } else { ord.reverse() };
            }
            let (x, y) = (a.value(key), b.value(key));
            match (x.is_nan(), y.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) if ascending => x.total_cmp(&y),
                (false, false) => y.total_cmp(&x),
            }
        });
        self
    }

    /// Rename rows to their representative names for display.
    pub fn decoded(self, dictionary: &DrugDictionary) -> Result<Self> {
        let mut rows = IndexMap::with_capacity(self.rows.len());
        for (id, mut row) in self.rows {
            let name = dictionary.decode(&id)?.to_string();
            if rows.contains_key(&name) {
                return Err(SignalError::DuplicateDrug(name));
            }
            row.drug = name.clone();
            rows.insert(name, row);
        }
        Ok(Self {
            rows,
            options: self.options,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, drug: &str) -> Option<&SignalRow> {
        self.rows.get(drug)
    }

    pub fn rows(&self) -> impl Iterator<Item = &SignalRow> {
        self.rows.values()
    }

    /// Rows whose ROR and interval are finite, in table order.
    pub fn finite_rows(&self) -> impl Iterator<Item = &SignalRow> {
        self.rows.values().filter(|r| r.is_finite())
    }

    pub fn drugs(&self) -> impl Iterator<Item = &DrugId> {
        self.rows.keys()
    }

    pub fn options(&self) -> &StatsOptions {
        &self.options
    }

    /// Columnar export in [`COLUMNS`] order; inf and NaN pass through.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let rows: Vec<&SignalRow> = self.rows.values().collect();
        let count = |f: fn(&ContingencyCounts) -> i64| -> Vec<i64> {
            rows.iter().map(|r| f(&r.counts)).collect()
        };
        let float = |f: fn(&SignalRow) -> f64| -> Vec<f64> { rows.iter().map(|r| f(r)).collect() };
        let optional = |f: fn(&SignalRow) -> Option<f64>| -> Vec<Option<f64>> {
            rows.iter().map(|r| f(r)).collect()
        };
        DataFrame::new(vec![
            Series::new(
                COLUMNS[0].into(),
                rows.iter().map(|r| r.drug.clone()).collect::<Vec<_>>(),
            ),
            Series::new(COLUMNS[1].into(), count(|c| c.n11)),
            Series::new(COLUMNS[2].into(), count(|c| c.n12)),
            Series::new(COLUMNS[3].into(), count(|c| c.n21)),
            Series::new(COLUMNS[4].into(), count(|c| c.n22)),
            Series::new(COLUMNS[5].into(), count(|c| c.n1p)),
            Series::new(COLUMNS[6].into(), count(|c| c.n2p)),
            Series::new(COLUMNS[7].into(), count(|c| c.np1)),
            Series::new(COLUMNS[8].into(), count(|c| c.np2)),
            Series::new(COLUMNS[9].into(), count(|c| c.npp)),
            Series::new(COLUMNS[10].into(), float(|r| r.ror)),
            Series::new(COLUMNS[11].into(), float(|r| r.lower_ci)),
            Series::new(COLUMNS[12].into(), float(|r| r.upper_ci)),
            Series::new(COLUMNS[13].into(), optional(|r| r.chi_square)),
            Series::new(COLUMNS[14].into(), optional(|r| r.p_value)),
            Series::new(COLUMNS[15].into(), optional(|r| r.q_bh)),
            Series::new(COLUMNS[16].into(), optional(|r| r.q_holm)),
            Series::new(COLUMNS[17].into(), optional(|r| r.ic_lower)),
        ])
    }

    pub fn write_csv(&self, path: &Path) -> anyhow::Result<()> {
        let mut df = self.to_dataframe()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path).with_context(|| format!("create {path:?}"))?;
        CsvWriter::new(&mut file).finish(&mut df)?;
        info!(path = %path.display(), rows = df.height(), "wrote signal table");
        Ok(())
    }

    pub fn write_parquet(&self, path: &Path) -> anyhow::Result<()> {
        let mut df = self.to_dataframe()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path).with_context(|| format!("create {path:?}"))?;
        ParquetWriter::new(file).finish(&mut df)?;
        info!(path = %path.display(), rows = df.height(), "wrote signal table");
        Ok(())
    }
}
