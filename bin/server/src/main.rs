use medigate_gateway::AuthGateway;
use medigate_identity::HttpIdentityProvider;
use medigate_server::{
    app,
    config::{CorsConfig, ServerConfig, ValidatedConfig},
    db::PgAccountRepository,
    state::AppState,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env()?;
    let listen_addr = config.listen_addr.clone();
    let cors = config.cors.clone();
    tracing::info!("Loaded configuration");

    let state = match config.validate() {
        Ok(validated) => build_state(validated).await?,
        Err(missing) => {
            // Keep serving so clients get a consistent error body.
            tracing::error!(missing = ?missing.keys, "{missing}");
            AppState::misconfigured(missing)
        }
    };

    serve(&listen_addr, state, &cors).await
}

async fn build_state(config: ValidatedConfig) -> Result<AppState, BoxError> {
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    let identity = HttpIdentityProvider::new(config.identity).map_err(|e| e.to_string())?;
    let repository = Arc::new(PgAccountRepository::new(db_pool));
    let gateway = AuthGateway::new(
        Arc::new(identity),
        repository.clone(),
        repository,
        config.gateway,
    );

    Ok(AppState::ready(gateway))
}

async fn serve(addr: &str, state: AppState, cors: &CorsConfig) -> Result<(), BoxError> {
    let router = app::router(state, cors);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
