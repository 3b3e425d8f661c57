//! Runtime configuration utilities for faers-signal.

use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;

use crate::signals::stats::{StatsOptions, Z_95};

/// Application configuration resolved from `.env` and defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Root folder for input artefacts.
    pub data_dir: PathBuf,
    /// Root folder for exported signal tables.
    pub outputs_dir: PathBuf,
    /// Worker threads for table construction; 0 uses every core.
    pub threads: usize,
    /// z used for the ROR confidence interval.
    pub ci_z: f64,
    /// Family-wise alpha for multiple-testing discoveries.
    pub alpha: f64,
    /// Drop congenital and product-issue MedDRA terms on load.
    pub meddra_ignore: bool,
    /// Minimum reporter qualification admitted into the corpus.
    pub min_qualification: Option<u8>,
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl Settings {
    /// Load configuration from environment with reasonable defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let outputs_dir = env::var("OUTPUTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./outputs"));

        std::fs::create_dir_all(&data_dir).context("creating data dir")?;
        std::fs::create_dir_all(&outputs_dir).context("creating outputs dir")?;

        Ok(Self {
            data_dir,
            outputs_dir,
            threads: parsed("SIGNAL_THREADS").unwrap_or(0),
            ci_z: parsed("SIGNAL_CI_Z").unwrap_or(Z_95),
            alpha: parsed("SIGNAL_ALPHA").unwrap_or(0.05),
            meddra_ignore: parsed("MEDDRA_IGNORE").unwrap_or(true),
            min_qualification: parsed("MIN_QUALIFICATION"),
        })
    }

    /// Statistics options derived from the configured levels.
    pub fn stats_options(&self) -> StatsOptions {
        StatsOptions {
            z: self.ci_z,
            alpha: self.alpha,
            ..StatsOptions::default()
        }
    }

    /// Size the global rayon pool. Only the first call in a process wins.
    pub fn init_worker_pool(&self) {
        if self.threads > 0 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(self.threads)
                .build_global()
                .ok();
        }
    }

    /// Convenience helper for derived path segments.
    pub fn join_data<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.data_dir.join(path)
    }

    /// Convenience helper for derived output path segments.
    pub fn join_output<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.outputs_dir.join(path)
    }
}
