use pms_orchestrator::{build_state, config::AppConfig, create_router};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize tracing subscriber; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("PMS Orchestrator - Starting...");

    // Reads .env first when present
    let config = AppConfig::from_env().expect("Invalid configuration");
    tracing::info!(storage = ?config.storage, "Configuration loaded");

    let state = build_state(&config)
        .await
        .expect("Failed to initialize application state");

    let app = create_router(state);

    let addr = config.bind_address();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("PMS Orchestrator is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
