//! Entry point wiring CLI dispatch to the analysis pipeline.

use anyhow::Result;
use faers_signal::{cli::Cli, config::Settings, logging};
use tracing::{info, instrument};

#[tokio::main]
#[instrument]
async fn main() -> Result<()> {
    logging::init_tracing()?;
    let settings = Settings::load()?;
    settings.init_worker_pool();
    let cli = Cli::parse();

    info!(?cli, "starting command");
    cli.dispatch(settings).await
}
