use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use calfeed_core::{FeedConfig, FeedRequest, ReqwestHttpClient, Snapshot, SnapshotCache};

use crate::cli::RenderArgs;
use crate::error::CliError;
use crate::server::AppState;

pub async fn run(args: &RenderArgs, config: &FeedConfig) -> Result<ExitCode, CliError> {
    let state = AppState::from_config(config.clone(), Arc::new(ReqwestHttpClient::new()));
    let snapshot = write_feed(&state.cache, args.all, args.output.as_deref()).await?;

    if snapshot.degraded {
        return Err(CliError::Degraded);
    }
    Ok(ExitCode::SUCCESS)
}

/// Builds one fresh snapshot and writes it to `output`, or stdout.
pub(crate) async fn write_feed(
    cache: &SnapshotCache,
    include_all: bool,
    output: Option<&Path>,
) -> Result<Arc<Snapshot>, CliError> {
    let snapshot = cache
        .get(FeedRequest {
            force: true,
            include_all,
        })
        .await;

    match output {
        Some(path) => {
            tokio::fs::write(path, snapshot.body.as_bytes()).await?;
            tracing::info!(path = %path.display(), bytes = snapshot.body.len(), "calendar written");
        }
        None => print!("{}", snapshot.body),
    }
    Ok(snapshot)
}
