//! File-backed providers for the corpus, MedDRA hierarchy and drug dictionary.

use std::{fs::File, path::Path};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use polars::prelude::{CsvReadOptions, DataFrame, DataType, ParquetReader, SerReader, Series};
use serde::Deserialize;
use tracing::info;

use crate::data::{
    corpus::{Corpus, CorpusBuilder, DrugId},
    dictionary::{DrugDictionary, DrugEntry},
    meddra::{MeddraHierarchy, MeddraTerm},
};

/// Parse `YYYYMMDD` or `YYYY-MM-DD`. Zero, blank and malformed values mean
/// "no usable date".
pub fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

fn read_frame(path: &Path) -> Result<DataFrame> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase);
    let df = match ext.as_deref() {
        Some("parquet") => ParquetReader::new(File::open(path)?).finish()?,
        Some("csv") | Some("txt") => CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?,
        _ => return Err(anyhow!("unsupported case file {path:?}; expected csv or parquet")),
    };
    Ok(df)
}

fn text_column(df: &DataFrame, name: &str) -> Result<Series> {
    Ok(df
        .column(name)
        .with_context(|| format!("missing column {name}"))?
        .cast(&DataType::String)?)
}

/// Load long-format case rows (`case_id`, `drug_id`, `rxn_id`, optional
/// `event_date` and `qualification`) into a corpus.
pub fn load_cases(path: &Path) -> Result<Corpus> {
    let df = read_frame(path).with_context(|| format!("read cases from {path:?}"))?;
    let case_col = text_column(&df, "case_id")?;
    let drug_col = text_column(&df, "drug_id")?;
    let rxn_col = text_column(&df, "rxn_id")?;
    let date_col = df
        .column("event_date")
        .ok()
        .map(|c| c.cast(&DataType::String))
        .transpose()?;
    let qual_col = df
        .column("qualification")
        .ok()
        .map(|c| c.cast(&DataType::Int64))
        .transpose()?;

    let cases = case_col.str()?;
    let drugs = drug_col.str()?;
    let reactions = rxn_col.str()?;
    let dates = date_col.as_ref().map(|c| c.str()).transpose()?;
    let quals = qual_col.as_ref().map(|c| c.i64()).transpose()?;

    let mut builder = CorpusBuilder::default();
    for idx in 0..df.height() {
        let Some(case) = cases.get(idx) else {
            continue;
        };
        if let Some(drug) = drugs.get(idx) {
            builder.add_drug(case, drug.trim());
        }
        if let Some(reaction) = reactions.get(idx) {
            builder.add_reaction(case, reaction);
        }
        if let Some(dates) = dates {
            builder.set_event_date(case, dates.get(idx).and_then(parse_event_date));
        }
        if let Some(quals) = quals {
            builder.set_qualification(case, quals.get(idx).and_then(|q| u8::try_from(q).ok()));
        }
    }
    let corpus = builder.build()?;
    info!(
        path = %path.display(),
        rows = df.height(),
        cases = corpus.len(),
        dated = corpus.dated_len(),
        "loaded case corpus"
    );
    Ok(corpus)
}

#[derive(Debug, Deserialize)]
struct MeddraRow {
    #[serde(default, alias = "rxn_id")]
    id: Option<String>,
    #[serde(alias = "PT")]
    pt: String,
    #[serde(alias = "HLT")]
    hlt: String,
    #[serde(alias = "HLGT")]
    hlgt: String,
    #[serde(alias = "SOC")]
    soc: String,
}

/// Load a flattened MedDRA hierarchy CSV (`PT,HLT,HLGT,SOC`, optional `id`).
pub fn load_meddra(path: &Path, ignore_unrelated: bool) -> Result<MeddraHierarchy> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("open meddra file {path:?}"))?;
    let mut terms = Vec::new();
    for result in reader.deserialize() {
        let row: MeddraRow = result?;
        let term = MeddraTerm::new(&row.pt, &row.hlt, &row.hlgt, &row.soc);
        terms.push(match row.id.filter(|id| !id.trim().is_empty()) {
            Some(id) => term.with_id(id),
            None => term,
        });
    }
    info!(path = %path.display(), terms = terms.len(), "loaded meddra hierarchy");
    let hierarchy = MeddraHierarchy::new(terms);
    Ok(if ignore_unrelated {
        hierarchy.without_ignored()
    } else {
        hierarchy
    })
}

#[derive(Debug, Deserialize)]
struct DictionaryRow {
    drug_id: String,
    drug_name: String,
    representative: u8,
}

/// Load `drug_id,drug_name,representative` rows (representative is 0/1).
pub fn load_drug_dictionary(path: &Path) -> Result<DrugDictionary> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("open drug dictionary {path:?}"))?;
    let mut entries = Vec::new();
    for result in reader.deserialize() {
        let row: DictionaryRow = result?;
        entries.push(DrugEntry {
            drug_id: row.drug_id.trim().to_string(),
            drug_name: row.drug_name,
            representative: row.representative != 0,
        });
    }
    let dictionary = DrugDictionary::new(entries);
    info!(path = %path.display(), drugs = dictionary.len(), "loaded drug dictionary");
    Ok(dictionary)
}

#[derive(Debug, Deserialize)]
struct FirstOccurrenceRow {
    drug_id: String,
    date: String,
}

/// Load provider-supplied market-entry dates (`drug_id,date`).
pub fn load_first_occurrence(path: &Path) -> Result<Vec<(DrugId, NaiveDate)>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("open first dates {path:?}"))?;
    let mut out = Vec::new();
    for result in reader.deserialize() {
        let row: FirstOccurrenceRow = result?;
        let date = parse_event_date(&row.date)
            .ok_or_else(|| anyhow!("bad date {:?} for drug {}", row.date, row.drug_id))?;
        out.push((row.drug_id.trim().to_string(), date));
    }
    info!(path = %path.display(), drugs = out.len(), "loaded first-occurrence dates");
    Ok(out)
}
