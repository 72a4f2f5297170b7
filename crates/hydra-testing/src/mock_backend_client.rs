//! Fake Ollama-style node backed by `wiremock`, for exercising the Router,
//! Pool Facade, and Health Monitor against a real HTTP listener without a
//! GPU host anywhere nearby.

use hydra_client::BackendClient;
use hydra_core::node::{Node, NodeId, NodeKind};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A running fake node together with a [`BackendClient`] already pointed
/// at it. Dropping it tears the listener down.
pub struct MockBackendClient {
    server: MockServer,
    client: BackendClient,
}

impl MockBackendClient {
    /// Starts a fresh mock server. Individual tests layer `Mock`s on top
    /// via the `mock_*` helpers before exercising [`Self::client`].
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let client = BackendClient::new(server.uri());
        Self { server, client }
    }

    #[must_use]
    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    #[must_use]
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    #[must_use]
    pub fn address(&self) -> std::net::SocketAddr {
        *self.server.address()
    }

    /// Registers the listener's address as a [`Node`] the registry or
    /// router can route to.
    #[must_use]
    pub fn as_node(&self, id: impl Into<NodeId>, kind: NodeKind) -> Node {
        let addr = self.address();
        Node::new(id, addr.ip().to_string(), addr.port(), kind)
    }

    /// Makes `/api/generate` return `text` for every request.
    pub async fn mock_generate_ok(&self, text: &str) {
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": text,
                "done": true
            })))
            .mount(&self.server)
            .await;
    }

    /// Makes `/api/generate` fail with a 500, simulating a transport error.
    pub async fn mock_generate_error(&self) {
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&self.server)
            .await;
    }

    /// Makes `/api/generate` fail with the CUDA-OOM phrasing `hydra-pool`
    /// recognizes as an out-of-memory indicator.
    pub async fn mock_generate_oom(&self) {
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("CUDA error: out of memory"))
            .mount(&self.server)
            .await;
    }

    /// Makes `/api/tags` report `models` as currently available.
    pub async fn mock_list_models(&self, models: &[&str]) {
        let body = serde_json::json!({
            "models": models.iter().map(|m| serde_json::json!({"name": m})).collect::<Vec<_>>()
        });
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydra_core::request::GenerationOptions;

    #[tokio::test]
    async fn mock_generate_ok_drives_a_real_client() {
        let backend = MockBackendClient::start().await;
        backend.mock_generate_ok("hi there").await;

        let outcome = backend.client().generate("llama3.2:3b", "hello", &GenerationOptions::default()).await.unwrap();
        assert_eq!(outcome.text, "hi there");
    }

    #[tokio::test]
    async fn as_node_points_at_the_mock_listener() {
        let backend = MockBackendClient::start().await;
        let node = backend.as_node(NodeId::new("n1"), NodeKind::Gpu);
        assert_eq!(node.port, backend.address().port());
    }

    #[tokio::test]
    async fn mock_list_models_is_visible_through_the_client() {
        let backend = MockBackendClient::start().await;
        backend.mock_list_models(&["llama3.2:3b"]).await;
        let models = backend.client().list_models().await.unwrap();
        assert_eq!(models, vec!["llama3.2:3b"]);
    }
}
