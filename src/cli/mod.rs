//! Command-line interface wiring for faers-signal.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use crate::{config::Settings, signals::Scope};

pub mod search;
pub mod serve;
pub mod signal;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(author, version, about = "FAERS disproportionality signal detection", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Dispatch the selected sub-command.
    pub async fn dispatch(self, settings: Settings) -> Result<()> {
        match self.command {
            Commands::Signal(args) => signal::run(args, settings).await,
            Commands::Drugs(args) => search::drugs(args, settings).await,
            Commands::Reactions(args) => search::reactions(args, settings).await,
            Commands::Serve(args) => serve::run(args, settings).await,
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compute the disproportionality table for a reaction category.
    Signal(signal::Args),
    /// List drug identities or names containing a keyword.
    Drugs(search::DrugArgs),
    /// List MedDRA labels containing a keyword.
    Reactions(search::ReactionArgs),
    /// Serve the last exported table over HTTP.
    Serve(serve::Args),
}

/// Corpus scope used when counting each drug's table.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum PolicyArg {
    /// Count against every record.
    #[default]
    Whole,
    /// Count only records after each drug's market entry.
    TimeBoundary,
}

impl From<PolicyArg> for Scope {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Whole => Scope::WholeCorpus,
            PolicyArg::TimeBoundary => Scope::MarketEntry,
        }
    }
}
