//! HTTP layer exposing the last exported signal table.

pub mod routes;
pub mod types;

use std::net::SocketAddr;

use anyhow::Result;
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::config::Settings;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
}

/// Routes without a bound listener, for embedding and tests.
pub fn router(settings: Settings) -> Router {
    Router::new()
        .route("/signals", get(routes::list_signals))
        .route("/signals/:drug", get(routes::get_signal))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { settings })
}

pub async fn serve(settings: Settings, host: String, port: u16) -> Result<()> {
    let router = router(settings);
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    info!(%addr, "serving faers-signal API");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}
