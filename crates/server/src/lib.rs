//! Unified HTTP server for AgentWorld extensions.
//!
//! Every extension gets the same pipeline: request counting, the combined
//! security gate (rate limit then auth), body decoding, the standard
//! endpoint set (`/health`, `/metrics`, `/metrics.prom`, `/docs`,
//! `/status`), its own route table, and the uniform response envelope with
//! CORS and security headers on every response.
//!
//! Built on Axum; request handling is multi-threaded via the tokio runtime.

pub mod handler;
pub mod table;

pub use handler::{build_router, ServerState};
pub use table::{Route, RouteMethod, RouteTable};

use agentworld_core::ExtensionApi;
use agentworld_config::HttpConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Bind and serve an extension until the returned future resolves.
pub async fn serve(
    api: Arc<dyn ExtensionApi>,
    routes: RouteTable,
    http_config: HttpConfig,
    host: &str,
) -> std::io::Result<()> {
    let port = api.identity().port;
    let addr = format!("{host}:{port}");
    let extension = api.identity().name.clone();

    let app = build_router(ServerState::new(api, routes, http_config));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(extension = %extension, addr = %addr, "Extension HTTP server started");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}
