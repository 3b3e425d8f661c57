//! Disproportionality signal detection over adverse-event report corpora.
//!
//! A [`data::corpus::Corpus`] of case records and a reaction
//! [`data::corpus::FocusSet`] go into [`analysis::SignalAnalysis::run`], which
//! counts a 2x2 contingency table per drug and attaches ROR, confidence
//! interval, chi-square with multiple-testing correction and the Information
//! Component lower bound.

pub mod analysis;
pub mod api;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod signals;

pub use analysis::SignalAnalysis;
pub use error::{Result, SignalError};
