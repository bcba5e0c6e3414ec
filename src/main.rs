use clap::Parser;
use color_eyre::Result;
use queue_it_exporter::{
    init_logging,
    run,
};
use queue_it_exporter_config::{
    Args,
    Config,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config = Config::new(Args::parse())?;
    tracing::debug!(?config, "loaded config");

    run(config.resolve()?).await
}
