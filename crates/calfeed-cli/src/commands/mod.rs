mod probe;
mod render;
mod serve;

use std::process::ExitCode;

use calfeed_core::FeedConfig;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    let mut config = FeedConfig::from_env()?;
    if let Some(days) = cli.lookahead_days {
        config.lookahead_days = days;
    }
    tracing::debug!(?config, "configuration loaded");

    match &cli.command {
        Command::Serve(args) => serve::run(args, config).await,
        Command::Render(args) => render::run(args, &config).await,
        Command::Probe(args) => probe::run(args, &config).await,
    }
}
