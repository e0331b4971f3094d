use std::process::ExitCode;
use std::sync::Arc;

use calfeed_core::{diagnostics, FeedConfig, ReqwestHttpClient};

use crate::cli::ProbeArgs;
use crate::error::CliError;
use crate::server::AppState;

pub async fn run(args: &ProbeArgs, config: &FeedConfig) -> Result<ExitCode, CliError> {
    let state = AppState::from_config(config.clone(), Arc::new(ReqwestHttpClient::new()));
    let report = diagnostics::probe(
        &state.client,
        state.current_window(),
        config.include_all_earnings,
        &state.seed,
    )
    .await;

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");

    let reachable = [report.sp500_status, report.earnings_status, report.economics_status]
        .into_iter()
        .all(|status| status == Some(200));
    Ok(if reachable {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
