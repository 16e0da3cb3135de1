use tokio::net::TcpListener;
use tracing::info;

use pv_handover_register::{app, HandoverConfig, HandoverService};

const BIND_ADDRESS: &str = "0.0.0.0:3000";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    info!("Starting PV handover service");

    let config = HandoverConfig::default();
    info!(
        "Loaded {} legal reference(s) for the report",
        config.legal_references.len()
    );

    let service = HandoverService::new(config);

    let listener = TcpListener::bind(BIND_ADDRESS).await?;
    info!("Server running on http://{}", BIND_ADDRESS);

    axum::serve(listener, app(service)).await?;

    Ok(())
}
