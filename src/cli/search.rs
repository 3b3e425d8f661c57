//! CLI entry-points for keyword exploration of drugs and reaction terms.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use crate::{
    config::Settings,
    data::{load, meddra::Layer},
};

/// Args for the `drugs` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct DrugArgs {
    /// Substring to look for.
    pub keyword: String,
    /// Case file whose drug vocabulary is searched.
    #[arg(long)]
    pub cases: Option<PathBuf>,
    /// Also search the names of this drug dictionary.
    #[arg(long)]
    pub dictionary: Option<PathBuf>,
}

/// Args for the `reactions` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct ReactionArgs {
    /// Substring to look for.
    pub keyword: String,
    /// Flattened MedDRA hierarchy; defaults to `<DATA_DIR>/meddra.csv`.
    #[arg(long)]
    pub meddra: Option<PathBuf>,
    /// Layers to search.
    #[arg(long, value_delimiter = ',', default_value = "SOC,HLGT,HLT")]
    pub layers: Vec<String>,
}

#[instrument(skip(settings))]
pub async fn drugs(args: DrugArgs, settings: Settings) -> Result<()> {
    let keyword = args.keyword.to_lowercase();
    let cases = args
        .cases
        .unwrap_or_else(|| settings.join_data("cases.csv"));
    let corpus = load::load_cases(&cases)?;
    let hits: Vec<&String> = corpus
        .drugs()
        .filter(|d| d.to_lowercase().contains(&keyword))
        .collect();
    for drug in &hits {
        println!("{drug}");
    }
    println!(">> {} candidates in corpus", hits.len());

    if let Some(path) = args.dictionary {
        let dictionary = load::load_drug_dictionary(&path)?;
        let names = dictionary.search(&keyword);
        for name in &names {
            println!("{name}");
        }
        println!(">> {} candidates in dictionary", names.len());
    }
    Ok(())
}

#[instrument(skip(settings))]
pub async fn reactions(args: ReactionArgs, settings: Settings) -> Result<()> {
    let path = args
        .meddra
        .unwrap_or_else(|| settings.join_data("meddra.csv"));
    let meddra = load::load_meddra(&path, settings.meddra_ignore)?;
    let layers = args
        .layers
        .iter()
        .map(|l| l.parse::<Layer>())
        .collect::<Result<Vec<_>, _>>()?;
    for (layer, hits) in meddra.search(&args.keyword, &layers) {
        println!("------------ {layer} ------------");
        for label in &hits {
            println!("{label}");
        }
        println!();
    }
    Ok(())
}
