//! `lonebox ps`: List containers known to the engine.

use anyhow::Context;
use clap::Args;
use lonebox_common::config::LoneboxConfig;
use lonebox_runtime::backend;

/// Arguments for the `ps` command.
#[derive(Args, Debug)]
pub struct PsArgs {
    /// Include stopped containers.
    #[arg(short, long)]
    pub all: bool,
}

/// Executes the `ps` command.
///
/// # Errors
///
/// Returns an error if the engine cannot be reached or queried.
pub async fn execute(args: PsArgs, config: LoneboxConfig) -> anyhow::Result<()> {
    let engine = backend::connect(&config, false)?;
    let containers = tokio::time::timeout(config.engine_timeout(), engine.list(args.all))
        .await
        .context("engine did not answer in time")??;

    #[allow(clippy::print_stdout)]
    {
        print!("{}", crate::output::format_containers(&containers));
    }
    Ok(())
}
