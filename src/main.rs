use std::sync::Arc;

use anyhow::Context;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use kubeatlas_clusters::{
    router,
    services::{ClusterService, RedisWorkflowQueue, WebkubectlClient},
    store::RedisClusterStore,
    AppState, Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_level))
        .with_target(false)
        .with_thread_ids(true)
        .init();

    info!("🚀 Starting KubeAtlas cluster service...");
    info!("✅ Configuration loaded (read policy: {:?})", config.read_policy);

    let store =
        RedisClusterStore::new(&config.redis_url).context("Failed to create cluster store")?;
    let workflows = Arc::new(
        RedisWorkflowQueue::new(&config.redis_url).context("Failed to create workflow queue")?,
    );
    let tokens = WebkubectlClient::new(config.webkubectl_token_url());

    let cluster_service = ClusterService::new(
        Arc::new(store),
        workflows.clone(),
        workflows,
        Arc::new(tokens),
    )
    .with_config(&config);
    info!("✅ Cluster service initialized");

    let app_state = AppState {
        config: config.clone(),
        cluster_service,
    };

    let app = router(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
    );

    let listener = tokio::net::TcpListener::bind(&config.server_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server_address))?;
    info!("🌐 Server listening on {}", config.server_address);

    axum::serve(listener, app).await.context("Server error")?;

    info!("✅ Server stopped gracefully");
    Ok(())
}
