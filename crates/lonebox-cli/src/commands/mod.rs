//! CLI command definitions and dispatch.

pub mod ps;
pub mod serve;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lonebox_common::config::LoneboxConfig;

/// Lonebox, a single-container lifecycle service.
#[derive(Parser, Debug)]
#[command(name = "lonebox", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// JSON configuration file.
    #[arg(long, global = true, env = "LONEBOX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Docker engine endpoint (unix://, tcp:// or http://).
    #[arg(long, global = true, env = "LONEBOX_ENGINE_HOST")]
    pub engine_host: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the lifecycle API.
    Serve(serve::ServeArgs),
    /// List containers known to the engine.
    Ps(ps::PsArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the command fails.
pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => LoneboxConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => LoneboxConfig::default(),
    };
    if let Some(host) = cli.engine_host {
        config.engine_host = host;
    }

    match cli.command {
        Command::Serve(args) => serve::execute(args, config).await,
        Command::Ps(args) => ps::execute(args, config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_accepts_repeated_mounts() {
        let cli = Cli::try_parse_from([
            "lonebox",
            "serve",
            "--mount",
            "/srv/test:/test",
            "--mount",
            "/srv/data:/data:ro",
            "--dry-run",
        ])
        .expect("parse");
        let Command::Serve(args) = cli.command else {
            unreachable!("parsed serve");
        };
        assert_eq!(args.mounts.len(), 2);
        assert!(args.mounts[1].read_only);
        assert!(args.dry_run);
    }

    #[test]
    fn relative_mount_is_a_parse_error() {
        assert!(Cli::try_parse_from(["lonebox", "serve", "--mount", "test:/test"]).is_err());
    }
}
