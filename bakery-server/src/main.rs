use bakery_server::{Config, Server, ServerState, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment (dotenv, logging)
    setup_environment();

    tracing::info!("Bakery server starting...");

    // 2. Configuration
    let config = Config::from_env();
    tracing::info!(
        environment = %config.environment,
        http_port = config.http_port,
        event_tcp_port = config.event_tcp_port,
        "Configuration loaded"
    );

    // 3. Service state
    let state = ServerState::initialize(&config)
        .await
        .map_err(|e| anyhow::anyhow!("Initialization failed: {}", e))?;

    // 4. HTTP server (starts background tasks itself)
    let server = Server::with_state(config, state);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(anyhow::anyhow!("Server error: {}", e));
    }

    Ok(())
}
