#![cfg(feature = "duckdb")]

//! Relational provider reading the case/drug/reaction schema from DuckDB.
//!
//! Produces the same in-memory types as the file loaders so the contingency
//! builder runs identically on either source.

use std::path::PathBuf;

use anyhow::Result;
use duckdb::Connection;
use tracing::info;

use crate::{
    config::Settings,
    data::{
        corpus::{Corpus, CorpusBuilder},
        dictionary::{DrugDictionary, DrugEntry},
        load::parse_event_date,
        meddra::{MeddraHierarchy, MeddraTerm},
    },
};

const CASE_QUERY: &str = "SELECT CAST(d.case_id AS VARCHAR), CAST(d.drug_id AS VARCHAR), \
     CAST(d.rxn_id AS VARCHAR), CAST(c.event_date AS VARCHAR), c.qualification \
     FROM drug_rxn_table d JOIN case_table c ON c.case_id = d.case_id";
const RXN_QUERY: &str =
    "SELECT CAST(rxn_id AS VARCHAR), pt, hlt, hlgt, soc FROM rxn_table";
const DRUG_QUERY: &str =
    "SELECT CAST(drug_id AS VARCHAR), drug_name, representative FROM drug_dict";

/// Wrapper around a DuckDB connection tied to the configured data directory.
pub struct DuckStore {
    pub conn: Connection,
    pub db_path: PathBuf,
}

impl DuckStore {
    /// Open (or create) `faers.duckdb` within the data directory.
    pub fn open(settings: &Settings) -> Result<Self> {
        let db_path = settings.join_data("faers.duckdb");
        let conn = Connection::open(&db_path)?;
        info!(path = %db_path.display(), "opened duckdb");
        Ok(Self { conn, db_path })
    }

    /// Cases joined with their drugs and reactions.
    pub fn load_corpus(&self) -> Result<Corpus> {
        let mut stmt = self.conn.prepare(CASE_QUERY)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<i64>>(4)?,
            ))
        })?;
        let mut builder = CorpusBuilder::default();
        for row in rows {
            let (case, drug, rxn, date, qualification) = row?;
            builder
                .add_drug(&case, drug)
                .add_reaction(&case, rxn)
                .set_event_date(&case, date.as_deref().and_then(parse_event_date))
                .set_qualification(&case, qualification.and_then(|q| u8::try_from(q).ok()));
        }
        let corpus = builder.build()?;
        info!(cases = corpus.len(), "loaded corpus from duckdb");
        Ok(corpus)
    }

    /// Reaction hierarchy keyed by `rxn_id`.
    pub fn load_meddra(&self) -> Result<MeddraHierarchy> {
        let mut stmt = self.conn.prepare(RXN_QUERY)?;
        let rows = stmt.query_map([], |row| {
            let term = MeddraTerm::new(
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            );
            Ok(term.with_id(row.get::<_, String>(0)?))
        })?;
        Ok(MeddraHierarchy::new(rows.collect::<Result<Vec<_>, _>>()?))
    }

    pub fn load_drug_dictionary(&self) -> Result<DrugDictionary> {
        let mut stmt = self.conn.prepare(DRUG_QUERY)?;
        let rows = stmt.query_map([], |row| {
            Ok(DrugEntry {
                drug_id: row.get(0)?,
                drug_name: row.get(1)?,
                representative: row.get::<_, i64>(2)? != 0,
            })
        })?;
        Ok(DrugDictionary::new(rows.collect::<Result<Vec<_>, _>>()?))
    }
}
