//! Command-line interface for inspecting and operating a PCV aggregator.

use pcv_aggregator::cli;
use pcv_aggregator::setup_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (ctx, command) = cli::CliEnv::parse_and_load()?;
    setup_tracing(&ctx.log_level);

    cli::run_command(ctx, command).await?;
    Ok(())
}
