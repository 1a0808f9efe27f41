// KubeAtlas cluster lifecycle library
// Public modules are exported for use in tests

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod store;

use axum::{
    routing::{get, post},
    Router,
};

pub use config::{Config, ReadPolicy};
pub use error::ClusterError;
pub use services::ClusterService;

use handlers::{cluster_handler, health_handler};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub cluster_service: ClusterService,
}

/// Routes for the cluster API, without transport middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler::health_check))
        .route(
            "/api/v1/clusters",
            get(cluster_handler::list_clusters).post(cluster_handler::create_cluster),
        )
        .route("/api/v1/clusters/batch", post(cluster_handler::batch))
        .route(
            "/api/v1/clusters/:name",
            get(cluster_handler::get_cluster).delete(cluster_handler::delete_cluster),
        )
        .route("/api/v1/clusters/:name/status", get(cluster_handler::get_status))
        .route("/api/v1/clusters/:name/secrets", get(cluster_handler::get_secrets))
        .route("/api/v1/clusters/:name/spec", get(cluster_handler::get_spec))
        .route("/api/v1/clusters/:name/plan", get(cluster_handler::get_plan))
        .route(
            "/api/v1/clusters/:name/endpoint",
            get(cluster_handler::get_api_server_endpoint),
        )
        .route("/api/v1/clusters/:name/router", get(cluster_handler::get_router_endpoint))
        .route(
            "/api/v1/clusters/:name/webkubectl",
            get(cluster_handler::get_webkubectl_token),
        )
        .with_state(state)
}
