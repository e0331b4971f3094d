//! axum server exposing the feed.

mod routes;
mod state;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use routes::FEED_PATH;
pub use state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route(FEED_PATH, get(routes::feed))
        .route("/health", get(routes::health))
        .route("/debug", get(routes::debug))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl-C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
