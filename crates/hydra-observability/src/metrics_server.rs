//! `/metrics` and `/health` routes, grounded on
//! `dashflow-observability/src/metrics_server.rs`. Mounted into
//! `hydra-cli serve-api`'s axum router rather than served standalone
//! (spec §10.1: "not a user-facing dashboard").

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::metrics;

/// Builds a small `Router` exposing `/metrics` in Prometheus text format
/// and `/health` for liveness checks. Callers merge this into their own
/// router with [`axum::Router::merge`].
#[must_use]
pub fn router() -> Router {
    Router::new().route("/metrics", get(metrics_handler)).route("/health", get(health_handler))
}

async fn metrics_handler() -> Response {
    match metrics::render() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

async fn health_handler() -> Response {
    (StatusCode::OK, "OK").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_route_returns_ok() {
        let app = router();
        let response = app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_route_responds_after_recorder_init() {
        let _ = metrics::init_recorder();
        let app = router();
        let response = app.oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
