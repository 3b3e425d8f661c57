//! CLI entry-point for computing a signal table.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Args as ClapArgs;
use tracing::{info, instrument, warn};

use crate::{
    analysis::SignalAnalysis,
    cli::PolicyArg,
    config::Settings,
    data::{
        corpus::Corpus,
        dictionary::DrugDictionary,
        load,
        meddra::{Layer, MeddraHierarchy, ReactionCriteria},
    },
    signals::{self, CancelToken, Policy, SortKey},
};

/// Args for the `signal` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Long-format case file (csv or parquet); defaults to `<DATA_DIR>/cases.csv`.
    #[arg(long)]
    pub cases: Option<PathBuf>,
    /// Flattened MedDRA hierarchy; defaults to `<DATA_DIR>/meddra.csv`.
    #[arg(long)]
    pub meddra: Option<PathBuf>,
    /// Drug dictionary (`drug_id,drug_name,representative`).
    #[arg(long)]
    pub dictionary: Option<PathBuf>,
    /// Provider-supplied market-entry dates (`drug_id,date`).
    #[arg(long)]
    pub first_dates: Option<PathBuf>,
    /// MedDRA layer of the category labels (SOC, HLGT, HLT, PT).
    #[arg(long, default_value = "SOC")]
    pub layer: String,
    /// Category label; repeat for several.
    #[arg(long = "category", required = true)]
    pub categories: Vec<String>,
    /// Match categories as substrings instead of exact labels.
    #[arg(long)]
    pub keyword: bool,
    /// Table-construction scope.
    #[arg(long, value_enum, default_value_t = PolicyArg::Whole)]
    pub policy: PolicyArg,
    /// Confound drug identity whose reports are removed first.
    #[arg(long)]
    pub exclude: Option<String>,
    /// Restrict to these drug names (resolved through the dictionary).
    #[arg(long, value_delimiter = ',')]
    pub drugs: Vec<String>,
    /// Merge drug identities into one row: `NAME=ID1,ID2`; repeatable.
    #[arg(long)]
    pub integrate: Vec<String>,
    /// Sort column of the exported table.
    #[arg(long, default_value = "lower_ci")]
    pub sort: String,
    #[arg(long)]
    pub ascending: bool,
    /// Disable Yates' continuity correction for chi-square.
    #[arg(long)]
    pub no_yates: bool,
    /// Replace identities with representative names in the export.
    #[arg(long)]
    pub decode: bool,
    /// Read cases, MedDRA and the dictionary from `<DATA_DIR>/faers.duckdb`.
    #[cfg(feature = "duckdb")]
    #[arg(long)]
    pub duckdb: bool,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let cancel = CancelToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; abandoning run");
                cancel.cancel();
            }
        })
    };
    let job = tokio::task::spawn_blocking(move || compute(&args, &settings, cancel));
    let outcome = job.await.context("signal worker panicked")?;
    watcher.abort();
    let path = outcome?;
    println!("{}", path.display());
    Ok(())
}

fn parse_integration(raw: &str) -> Result<(String, Vec<String>)> {
    let (name, members) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("integration `{raw}` must look like NAME=ID1,ID2"))?;
    let members = members
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect();
    Ok((name.trim().to_string(), members))
}

type Inputs = (Corpus, MeddraHierarchy, Option<DrugDictionary>);

fn load_files(args: &Args, settings: &Settings) -> Result<Inputs> {
    let cases_path = args
        .cases
        .clone()
        .unwrap_or_else(|| settings.join_data("cases.csv"));
    let meddra_path = args
        .meddra
        .clone()
        .unwrap_or_else(|| settings.join_data("meddra.csv"));
    let corpus = load::load_cases(&cases_path)?;
    let meddra = load::load_meddra(&meddra_path, settings.meddra_ignore)?;
    let dictionary = args
        .dictionary
        .as_deref()
        .map(load::load_drug_dictionary)
        .transpose()?;
    Ok((corpus, meddra, dictionary))
}

#[cfg(feature = "duckdb")]
fn load_inputs(args: &Args, settings: &Settings) -> Result<Inputs> {
    if !args.duckdb {
        return load_files(args, settings);
    }
    let store = crate::data::store::DuckStore::open(settings)?;
    let meddra = store.load_meddra()?;
    let meddra = if settings.meddra_ignore {
        meddra.without_ignored()
    } else {
        meddra
    };
    Ok((
        store.load_corpus()?,
        meddra,
        Some(store.load_drug_dictionary()?),
    ))
}

#[cfg(not(feature = "duckdb"))]
fn load_inputs(args: &Args, settings: &Settings) -> Result<Inputs> {
    load_files(args, settings)
}

fn compute(args: &Args, settings: &Settings, cancel: CancelToken) -> Result<PathBuf> {
    let (mut corpus, meddra, dictionary) = load_inputs(args, settings)?;
    if let Some(path) = &args.first_dates {
        corpus = corpus.with_first_occurrence(load::load_first_occurrence(path)?);
    }
    if let Some(min) = settings.min_qualification {
        corpus = corpus.retain_qualified(min);
        info!(min, cases = corpus.len(), "applied qualification filter");
    }

    let layer: Layer = args.layer.parse()?;
    let criteria = if args.keyword {
        let [keyword] = args.categories.as_slice() else {
            return Err(anyhow!("--keyword takes exactly one --category"));
        };
        ReactionCriteria::keyword(layer, keyword.clone())
    } else {
        ReactionCriteria::labels(layer, args.categories.iter().cloned())
    };

    let mut options = settings.stats_options();
    options.yates = !args.no_yates;
    let mut analysis = SignalAnalysis::new(&meddra)
        .with_options(options)
        .with_cancellation(cancel);
    if !args.drugs.is_empty() {
        let dictionary = dictionary
            .as_ref()
            .ok_or_else(|| anyhow!("--drugs needs --dictionary to resolve names"))?;
        analysis = analysis.with_candidates(dictionary.encode(args.drugs.as_slice())?);
    }

    let focus = analysis.select_reactions(&criteria)?;
    let policy = Policy {
        scope: args.policy.into(),
        exclude: None,
    };
    let mut table = analysis.run(&corpus, &focus, &policy, args.exclude.as_deref())?;

    for raw in &args.integrate {
        let (name, members) = parse_integration(raw)?;
        table = table.integrate(&name, members.as_slice())?;
    }
    let sort: SortKey = args.sort.parse()?;
    table = table.to_sorted(sort, args.ascending);
    if args.decode {
        let dictionary = dictionary
            .as_ref()
            .ok_or_else(|| anyhow!("--decode needs --dictionary"))?;
        table = table.decoded(dictionary)?;
    }

    signals::persist(settings, &table)
}
