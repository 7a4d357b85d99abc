//! HTTP transport for the MCP server using rmcp's StreamableHttpService.
//!
//! Usage: `tasksearch serve --tasks tasks.json --http 127.0.0.1:8080`

use super::server::TaskSearchServer;

/// Start the MCP server over HTTP on the given address.
///
/// The server exposes a single `/mcp` endpoint speaking the streamable HTTP
/// protocol. Sessions share one search service and metrics set.
pub async fn run_http_server(
    server: TaskSearchServer,
    addr: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    use rmcp::transport::streamable_http_server::{
        session::local::LocalSessionManager, StreamableHttpService,
    };

    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("tasksearch MCP server listening on http://{}/mcp", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down HTTP server");
        })
        .await?;

    Ok(())
}
