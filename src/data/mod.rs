//! Corpus model and the providers feeding it.

pub mod corpus;
pub mod dictionary;
pub mod load;
pub mod meddra;
#[cfg(feature = "duckdb")]
pub mod store;
