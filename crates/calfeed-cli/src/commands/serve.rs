use std::process::ExitCode;
use std::sync::Arc;

use calfeed_core::{FeedConfig, ReqwestHttpClient};

use crate::cli::ServeArgs;
use crate::error::CliError;
use crate::server::{self, AppState, FEED_PATH};

pub async fn run(args: &ServeArgs, mut config: FeedConfig) -> Result<ExitCode, CliError> {
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    let bind = format!("{}:{}", config.host, config.port);

    let state = AppState::from_config(config, Arc::new(ReqwestHttpClient::new()));
    if args.warm {
        let snapshot = state.cache.warm().await;
        tracing::info!(bytes = snapshot.body.len(), degraded = snapshot.degraded, "feed warmed");
    }

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .map_err(|e| CliError::Command(format!("cannot bind {bind}: {e}")))?;
    tracing::info!(
        addr = %listener.local_addr()?,
        feed = FEED_PATH,
        key = %state.config.key_prefix(),
        "serving calendar feed"
    );

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(ExitCode::SUCCESS)
}
