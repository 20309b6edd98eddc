use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::error;

use crate::bootstrap::BootstrapError;

use super::types::{BootstrapRequest, BootstrapResponse, ErrorResponse};
use super::ApiState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

pub async fn bootstrap_tenant(
    State(state): State<Arc<ApiState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Json(request): Json<BootstrapRequest>,
) -> ApiResult<BootstrapResponse> {
    let tenant = state
        .service
        .create_tenant(peer.ip(), &request.name, &request.token)
        .map_err(map_error)?;

    Ok(Json(tenant.into()))
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": "tenant-mqtt-broker" }))
}

fn map_error(err: BootstrapError) -> (StatusCode, Json<ErrorResponse>) {
    let code = match &err {
        BootstrapError::Malformed(_) => "malformed",
        BootstrapError::Unauthorized => "unauthorized",
        BootstrapError::AlreadyExists => "already_exists",
        BootstrapError::RateLimited => "rate_limited",
        BootstrapError::Internal(_) => "internal_error",
    };
    let status = match &err {
        BootstrapError::Malformed(_) => StatusCode::BAD_REQUEST,
        BootstrapError::Unauthorized => StatusCode::UNAUTHORIZED,
        BootstrapError::AlreadyExists => StatusCode::CONFLICT,
        BootstrapError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        BootstrapError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if matches!(err, BootstrapError::Internal(_)) {
        error!(error = %err, "bootstrap request failed");
    }

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: code.to_string(),
        }),
    )
}
