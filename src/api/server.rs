use crate::api::routes;
use crate::core::Dashboard;
use std::net::SocketAddr;
use tracing::info;

/// Starts and runs the HTTP server using Axum web framework
///
/// # Arguments
/// * `dashboard` - Dashboard service answering the requests
/// * `port` - Port number to listen on for incoming HTTP connections
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Ok once the server stops, Error if it cannot bind or fails
pub async fn launch_server(dashboard: Dashboard, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = routes::app(dashboard);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
