//! Signal computation layer: contingency tables, statistics, result table.

pub mod bayes;
pub mod chi2;
pub mod contingency;
pub mod ror;
pub mod stats;
pub mod table;

use std::path::PathBuf;

use anyhow::Result;

use crate::config::Settings;

pub use contingency::{CancelToken, ContingencyBuilder, ContingencyCounts, ContingencyRow, Policy, Scope};
pub use stats::StatsOptions;
pub use table::{SignalRow, SignalTable, SortKey};

/// File name of the CSV export served by the API.
pub const SIGNALS_CSV: &str = "signals.csv";

/// Write `table` as CSV (and Parquet alongside) into the outputs directory.
pub fn persist(settings: &Settings, table: &SignalTable) -> Result<PathBuf> {
    let csv_path = settings.join_output(SIGNALS_CSV);
    table.write_csv(&csv_path)?;
    table.write_parquet(&csv_path.with_extension("parquet"))?;
    Ok(csv_path)
}
