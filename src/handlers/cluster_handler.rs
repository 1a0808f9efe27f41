//! HTTP surface of the cluster lifecycle service
//!
//! Some endpoints report success with degraded data, as decided by the
//! service's read policy:
//! - `GET /api/v1/clusters` may return an empty list or page when the store is unreachable
//! - `GET /api/v1/clusters/:name/webkubectl` may return an empty token
//! - `POST /api/v1/clusters/batch` returns 200 even when individual deletes or
//!   terminations failed; check each item's `outcome` and `error`

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::{
    error::ClusterError,
    models::{
        ClusterBatch, ClusterCreate, ClusterSecret, ClusterSpec, ClusterStatus, ClusterView,
        Endpoint, ErrorResponse, PageQuery, WebkubectlToken,
    },
    AppState,
};

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn error_response(context: &str, e: ClusterError) -> HandlerError {
    let status = match &e {
        ClusterError::NotFound { .. } => StatusCode::NOT_FOUND,
        ClusterError::Validation(_) => StatusCode::BAD_REQUEST,
        ClusterError::Workflow(_) | ClusterError::Exchange(_) => StatusCode::BAD_GATEWAY,
        ClusterError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!("{}: {}", context, e);
    } else {
        warn!("{}: {}", context, e);
    }

    (
        status,
        Json(ErrorResponse {
            error: context.to_string(),
            message: Some(e.to_string()),
        }),
    )
}

pub async fn list_clusters(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, HandlerError> {
    match (query.page_num, query.page_size) {
        (Some(num), Some(size)) => match state.cluster_service.page(num, size).await {
            Ok(page) => Ok(Json(json!(page))),
            Err(e) => Err(error_response("Failed to page clusters", e)),
        },
        _ => match state.cluster_service.list().await {
            Ok(clusters) => Ok(Json(json!(clusters))),
            Err(e) => Err(error_response("Failed to list clusters", e)),
        },
    }
}

pub async fn create_cluster(
    State(state): State<AppState>,
    Json(request): Json<ClusterCreate>,
) -> Result<(StatusCode, Json<ClusterView>), HandlerError> {
    let name = request.name.trim().to_string();
    info!("Create cluster '{}' ({} nodes)", name, request.nodes.len());

    // provisioning runs on external workers; the handle is not awaited here
    if let Err(e) = state.cluster_service.create(request).await {
        return Err(error_response("Failed to create cluster", e));
    }

    match state.cluster_service.get(&name).await {
        Ok(view) => Ok((StatusCode::CREATED, Json(view))),
        Err(e) => Err(error_response("Failed to load created cluster", e)),
    }
}

pub async fn get_cluster(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ClusterView>, HandlerError> {
    match state.cluster_service.get(&name).await {
        Ok(view) => Ok(Json(view)),
        Err(e) => Err(error_response("Failed to get cluster", e)),
    }
}

pub async fn delete_cluster(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, HandlerError> {
    match state.cluster_service.delete(&name).await {
        Ok(()) => Ok(Json(json!({ "message": "Cluster deleted", "name": name }))),
        Err(e) => Err(error_response("Failed to delete cluster", e)),
    }
}

pub async fn get_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ClusterStatus>, HandlerError> {
    match state.cluster_service.get_status(&name).await {
        Ok(status) => Ok(Json(status)),
        Err(e) => Err(error_response("Failed to get cluster status", e)),
    }
}

pub async fn get_secrets(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ClusterSecret>, HandlerError> {
    match state.cluster_service.get_secrets(&name).await {
        Ok(secret) => Ok(Json(secret)),
        Err(e) => Err(error_response("Failed to get cluster secrets", e)),
    }
}

pub async fn get_spec(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ClusterSpec>, HandlerError> {
    match state.cluster_service.get_spec(&name).await {
        Ok(spec) => Ok(Json(spec)),
        Err(e) => Err(error_response("Failed to get cluster spec", e)),
    }
}

pub async fn get_plan(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, HandlerError> {
    match state.cluster_service.get_plan(&name).await {
        Ok(plan) => Ok(Json(json!({ "plan": plan }))),
        Err(e) => Err(error_response("Failed to get cluster plan", e)),
    }
}

pub async fn get_api_server_endpoint(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Endpoint>, HandlerError> {
    match state.cluster_service.get_api_server_endpoint(&name).await {
        Ok(endpoint) => Ok(Json(endpoint)),
        Err(e) => Err(error_response("Failed to resolve API server endpoint", e)),
    }
}

pub async fn get_router_endpoint(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Endpoint>, HandlerError> {
    match state.cluster_service.get_router_endpoint(&name).await {
        Ok(endpoint) => Ok(Json(endpoint)),
        Err(e) => Err(error_response("Failed to resolve router endpoint", e)),
    }
}

pub async fn get_webkubectl_token(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<WebkubectlToken>, HandlerError> {
    match state.cluster_service.get_webkubectl_token(&name).await {
        Ok(token) => Ok(Json(token)),
        Err(e) => Err(error_response("Failed to get console token", e)),
    }
}

pub async fn batch(
    State(state): State<AppState>,
    Json(batch): Json<ClusterBatch>,
) -> Result<Json<Value>, HandlerError> {
    info!("Batch {:?} on {} clusters", batch.operation, batch.items.len());
    match state.cluster_service.batch(batch).await {
        Ok(report) => Ok(Json(json!({ "items": report.results() }))),
        Err(e) => Err(error_response("Batch operation aborted", e)),
    }
}
