//! Local HTTP API
//!
//! Routes:
//! - `GET /health`    liveness probe
//! - `GET /services`  registry snapshot
//! - `GET /config`    running agent configuration
//! - `PUT /config`    persist a new configuration (applies on restart)
//! - `POST /pub`      publish a raw payload on a control channel

use crate::agent::Agent;
use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::registry::ServicesMap;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub channel: String,
    pub payload: String,
}

/// HTTP view of an `AgentError`.
pub struct ApiError(AgentError);

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_rejection() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        warn!("API request failed: {}", self.0);
        (status, self.0.to_string()).into_response()
    }
}

pub fn build_router(agent: Arc<Agent>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/services", get(list_services))
        .route("/config", get(get_config).put(put_config))
        .route("/pub", post(publish))
        .with_state(agent)
}

async fn list_services(State(agent): State<Arc<Agent>>) -> Json<ServicesMap> {
    Json(agent.services())
}

async fn get_config(State(agent): State<Arc<Agent>>) -> Json<AgentConfig> {
    Json(agent.config())
}

async fn put_config(
    State(agent): State<Arc<Agent>>,
    Json(mut config): Json<AgentConfig>,
) -> Result<StatusCode, ApiError> {
    config.file = agent.config().file;
    agent.add_config(&config).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn publish(
    State(agent): State<Arc<Agent>>,
    Json(req): Json<PublishRequest>,
) -> Result<StatusCode, ApiError> {
    agent.publish(&req.channel, req.payload.into_bytes()).await?;
    Ok(StatusCode::ACCEPTED)
}
