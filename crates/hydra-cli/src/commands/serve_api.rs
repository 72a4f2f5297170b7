//! `hydra serve-api`: exposes the Pool Facade and Orchestrator over HTTP
//! (spec.md §6 "serve-api"), plus the ambient `/metrics` and `/health`
//! routes from `hydra-observability`. Grounded on the `axum::Router` /
//! `with_state` shape in `dashflow-observability`'s websocket server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Args;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::AppContext;
use hydra_core::request::Request as GenerateRequest;
use hydra_core::Error;
use hydra_orchestrator::Orchestrator;

#[derive(Args)]
pub struct ServeApiArgs {
    /// Address to bind the HTTP server to.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,
}

struct ApiState {
    ctx: AppContext,
    orchestrator: Orchestrator,
}

#[derive(Deserialize)]
struct GenerateBody {
    prompt: String,
    model: Option<String>,
}

#[derive(Serialize)]
struct GenerateReply {
    text: String,
    model: String,
    node_id: String,
    duration_ms: u64,
}

#[derive(Deserialize)]
struct OrchestrateBody {
    prompt: String,
}

#[derive(Serialize)]
struct OrchestrateReply {
    response: String,
    confidence: f64,
    explanations: Vec<String>,
}

#[derive(Serialize)]
struct NodeSummary {
    id: String,
    host: String,
    port: u16,
    healthy: bool,
    success_rate: f64,
}

struct ApiError(Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            hydra_core::error::ErrorKind::NoHealthyNodes => StatusCode::SERVICE_UNAVAILABLE,
            hydra_core::error::ErrorKind::Configuration => StatusCode::BAD_REQUEST,
            hydra_core::error::ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

async fn generate_handler(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<GenerateReply>, ApiError> {
    let mut req = GenerateRequest::new(body.prompt);
    if let Some(model) = body.model {
        req = req.with_model(model);
    }
    let resp = state.ctx.pool.generate(&req).await?;
    Ok(Json(GenerateReply {
        text: resp.text,
        model: resp.model,
        node_id: resp.node_id.to_string(),
        duration_ms: resp.duration_ms,
    }))
}

async fn orchestrate_handler(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<OrchestrateBody>,
) -> Result<Json<OrchestrateReply>, ApiError> {
    let result = state.orchestrator.orchestrate(&body.prompt).await?;
    Ok(Json(OrchestrateReply {
        response: result.response,
        confidence: result.confidence,
        explanations: result.explanations,
    }))
}

async fn nodes_handler(State(state): State<Arc<ApiState>>) -> Json<Vec<NodeSummary>> {
    let nodes = state
        .ctx
        .pool
        .node_resources()
        .into_iter()
        .map(|n| NodeSummary { id: n.id.0, host: n.host, port: n.port, healthy: n.healthy, success_rate: n.success_rate() })
        .collect();
    Json(nodes)
}

pub async fn run(args: ServeApiArgs, ctx: AppContext) -> hydra_core::Result<()> {
    hydra_observability::metrics::init_recorder().ok();

    let orchestrator = Orchestrator::new(ctx.pool.clone(), ctx.config.clone());
    let state = Arc::new(ApiState { ctx, orchestrator });

    let app = Router::new()
        .route("/api/generate", post(generate_handler))
        .route("/api/orchestrate", post(orchestrate_handler))
        .route("/api/nodes", get(nodes_handler))
        .with_state(state)
        .merge(hydra_observability::metrics_server::router());

    info!(bind = %args.bind, "serve-api listening");
    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .map_err(|e| Error::configuration(format!("binding {}: {e}", args.bind)))?;
    axum::serve(listener, app).await.map_err(|e| Error::configuration(format!("serving: {e}")))?;
    Ok(())
}
