use clap::Parser;

use queryperf::cli::Args;
use queryperf::config::RunConfig;
use queryperf::engine::Engine;
use queryperf::stats::print_report;
use queryperf::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(if args.verbose { "debug" } else { "info" })
        .init();

    let config = RunConfig::from_args(&args)?;
    let engine = Engine::setup(&config).await?;
    let summary = engine.run().await;

    print_report(&summary);
    Ok(())
}
