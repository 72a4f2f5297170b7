//! Pool Facade (spec §4.5): the public API consumed by everything else.
//! Wraps the Router + Backend Client with retry/failover, per-node
//! concurrency caps, large-model eviction hints, and OOM-triggered model
//! fallback.

pub mod oom;

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use hydra_client::{BackendClient, GenerateChunk};
use hydra_core::event::Event;
use hydra_core::node::{ModelSizeClass, NodeId};
use hydra_core::request::{GenerateResponse, Request, RoutingHints};
use hydra_core::{Error, Result};
use hydra_registry::NodeRegistry;
use hydra_router::{Router, RoutingContext};
use tracing::{debug, warn};

/// Supplies the dispatcher's per-task-type fallback chain so the Pool can
/// step down to a smaller model on `ResourceExhausted` (spec §4.5, §7).
/// Kept as a small capability trait (spec §9 design note) so `hydra-pool`
/// never depends on `hydra-dispatcher`'s concrete type.
pub trait FallbackProvider: Send + Sync {
    fn smaller_model(&self, current_model: &str) -> Option<String>;
}

/// Resolves a model's size class, used to decide proactive `keep_alive=0`
/// eviction (spec §4.5). Implemented by whatever owns the model catalog;
/// defaults to treating every model as non-large when absent.
pub trait ModelCatalog: Send + Sync {
    fn size_class(&self, model: &str) -> Option<ModelSizeClass>;
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_attempts: u32,
    pub max_wait: Duration,
    pub slot_poll_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_wait: Duration::from_secs(30),
            slot_poll_interval: Duration::from_millis(20),
        }
    }
}

pub struct Pool {
    registry: Arc<NodeRegistry>,
    router: Router,
    config: PoolConfig,
    fallback: Option<Arc<dyn FallbackProvider>>,
    catalog: Option<Arc<dyn ModelCatalog>>,
}

fn default_model(req: &Request) -> String {
    req.model.clone().unwrap_or_else(|| "llama3.2:3b".to_string())
}

impl Pool {
    #[must_use]
    pub fn new(registry: Arc<NodeRegistry>, config: PoolConfig) -> Self {
        Self {
            registry,
            router: Router::new(),
            config,
            fallback: None,
            catalog: None,
        }
    }

    #[must_use]
    pub fn with_fallback_provider(mut self, provider: Arc<dyn FallbackProvider>) -> Self {
        self.fallback = Some(provider);
        self
    }

    #[must_use]
    pub fn with_model_catalog(mut self, catalog: Arc<dyn ModelCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    async fn acquire_slot_with_wait(&self, node_id: &NodeId) -> bool {
        let deadline = tokio::time::Instant::now() + self.config.max_wait;
        loop {
            if self.registry.try_acquire_slot(node_id) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(self.config.slot_poll_interval).await;
        }
    }

    /// Fires a non-blocking unload hint (`keep_alive=0`) at every
    /// currently-healthy node that reports the model loaded, ahead of
    /// dispatching a request for a `large` model (spec §4.5).
    fn maybe_broadcast_unload_hint(&self, model: &str) {
        let Some(catalog) = &self.catalog else { return };
        if catalog.size_class(model) != Some(ModelSizeClass::Large) {
            return;
        }
        let nodes = self.registry.all_snapshots();
        for node in nodes {
            if !node.healthy || !node.loaded_models.iter().any(|m| m != model) {
                continue;
            }
            let client = BackendClient::new(node.url());
            let stale_models: Vec<String> = node
                .loaded_models
                .iter()
                .filter(|m| m.as_str() != model)
                .cloned()
                .collect();
            tokio::spawn(async move {
                for stale in stale_models {
                    let mut opts = hydra_core::request::GenerationOptions::default();
                    opts.keep_alive = Some(0);
                    if let Err(err) = client.generate(&stale, "", &opts).await {
                        debug!(%stale, error = %err, "unload hint failed, ignoring");
                    }
                }
            });
        }
    }

    /// `generate(req) -> response` (spec §4.5). Fails over to the next
    /// candidate node on transport error up to `max_attempts`; falls back
    /// to a smaller model once on an OOM indicator.
    pub async fn generate(&self, req: &Request) -> Result<GenerateResponse> {
        let mut model = default_model(req);
        self.maybe_broadcast_unload_hint(&model);

        let mut attempts = 0u32;
        let mut tried_fallback = false;
        let mut tried_nodes: Vec<NodeId> = Vec::new();
        loop {
            attempts += 1;
            let decision = self
                .router
                .select_excluding(&self.registry, &req.hints, RoutingContext::default(), &tried_nodes)
                .ok_or_else(|| Error::no_healthy_nodes("no healthy node available"))?;

            if !self.acquire_slot_with_wait(&decision.node_id).await {
                if attempts >= self.config.max_attempts {
                    return Err(Error::transport("timed out waiting for a free node slot").with_node(decision.node_id.to_string()));
                }
                tried_nodes.push(decision.node_id);
                continue;
            }

            let node_snapshot = self
                .registry
                .snapshot(&decision.node_id)
                .ok_or_else(|| Error::no_healthy_nodes("selected node vanished from registry"))?;
            let client = BackendClient::new(node_snapshot.url());

            let started = std::time::Instant::now();
            let outcome = client.generate(&model, &req.prompt, &req.options).await;
            self.registry.release_slot(&decision.node_id);

            match outcome {
                Ok(result) => {
                    self.registry.mutate(&decision.node_id, |n| {
                        n.record_success(started.elapsed().as_millis() as u64);
                    });
                    return Ok(GenerateResponse {
                        text: result.text,
                        duration_ms: result.duration_ms,
                        model,
                        node_id: decision.node_id,
                    });
                }
                Err(err) => {
                    self.registry.mutate(&decision.node_id, |n| n.record_failure());

                    if oom::is_oom_indicator(&err.context.message) && !tried_fallback {
                        self.registry.mutate(&decision.node_id, |n| {
                            n.loaded_models.retain(|m| m != &model);
                        });
                        if let Some(smaller) = self.fallback.as_ref().and_then(|f| f.smaller_model(&model)) {
                            warn!(old_model = %model, new_model = %smaller, "OOM indicator observed, falling back to smaller model");
                            model = smaller;
                            tried_fallback = true;
                            continue;
                        }
                        return Err(Error::resource_exhausted(err.context.message).with_node(decision.node_id.to_string()));
                    }

                    if err.is_retryable() && attempts < self.config.max_attempts {
                        tried_nodes.push(decision.node_id);
                        continue;
                    }
                    return Err(err.with_node(decision.node_id.to_string()));
                }
            }
        }
    }

    /// `generate_stream(req) -> chunk sequence` (spec §4.5). Once the
    /// first chunk is yielded, further failures are terminal; zero chunks
    /// before failure re-routes to the next candidate.
    pub async fn generate_stream(
        &self,
        req: Request,
    ) -> Result<Pin<Box<dyn Stream<Item = Event> + Send>>> {
        let model = default_model(&req);
        self.maybe_broadcast_unload_hint(&model);

        let registry = self.registry.clone();
        let router = self.router.clone();
        let max_attempts = self.config.max_attempts;
        let max_wait = self.config.max_wait;
        let slot_poll = self.config.slot_poll_interval;

        let s = async_stream::stream! {
            let mut attempts = 0u32;
            let mut tried_nodes: Vec<hydra_core::node::NodeId> = Vec::new();
            'outer: loop {
                attempts += 1;
                let decision = match router.select_excluding(&registry, &req.hints, RoutingContext::default(), &tried_nodes) {
                    Some(d) => d,
                    None => {
                        yield Event::error(&Error::no_healthy_nodes("no healthy node available"));
                        return;
                    }
                };

                let deadline = tokio::time::Instant::now() + max_wait;
                loop {
                    if registry.try_acquire_slot(&decision.node_id) {
                        break;
                    }
                    if tokio::time::Instant::now() >= deadline {
                        if attempts >= max_attempts {
                            yield Event::error(&Error::transport("timed out waiting for a free node slot"));
                            return;
                        }
                        tried_nodes.push(decision.node_id);
                        continue 'outer;
                    }
                    tokio::time::sleep(slot_poll).await;
                }

                let node_snapshot = match registry.snapshot(&decision.node_id) {
                    Some(n) => n,
                    None => {
                        registry.release_slot(&decision.node_id);
                        tried_nodes.push(decision.node_id);
                        continue;
                    }
                };
                let client = BackendClient::new(node_snapshot.url());
                let started = std::time::Instant::now();
                let stream_result = client.generate_stream(&model, &req.prompt, &req.options).await;

                let mut inner = match stream_result {
                    Ok(s) => s,
                    Err(err) => {
                        registry.release_slot(&decision.node_id);
                        registry.mutate(&decision.node_id, |n| n.record_failure());
                        if err.is_retryable() && attempts < max_attempts {
                            tried_nodes.push(decision.node_id);
                            continue;
                        }
                        yield Event::error(&err);
                        return;
                    }
                };

                let mut yielded_any = false;
                loop {
                    match inner.next().await {
                        Some(Ok(GenerateChunk { response, done })) => {
                            yielded_any = true;
                            if !response.is_empty() {
                                yield Event::Chunk { text: response };
                            }
                            if done {
                                registry.release_slot(&decision.node_id);
                                registry.mutate(&decision.node_id, |n| {
                                    n.record_success(started.elapsed().as_millis() as u64);
                                });
                                yield Event::Done;
                                return;
                            }
                        }
                        Some(Err(err)) => {
                            registry.release_slot(&decision.node_id);
                            registry.mutate(&decision.node_id, |n| n.record_failure());
                            if !yielded_any && err.is_retryable() && attempts < max_attempts {
                                tried_nodes.push(decision.node_id);
                                continue 'outer;
                            }
                            yield Event::error(&err);
                            return;
                        }
                        None => {
                            registry.release_slot(&decision.node_id);
                            registry.mutate(&decision.node_id, |n| {
                                n.record_success(started.elapsed().as_millis() as u64);
                            });
                            yield Event::Done;
                            return;
                        }
                    }
                }
            }
        };
        Ok(Box::pin(s))
    }

    pub async fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>> {
        let decision = self
            .router
            .select(&self.registry, &RoutingHints::default(), RoutingContext::default())
            .ok_or_else(|| Error::no_healthy_nodes("no healthy node available"))?;
        let node = self
            .registry
            .snapshot(&decision.node_id)
            .ok_or_else(|| Error::no_healthy_nodes("selected node vanished from registry"))?;
        let client = BackendClient::new(node.url());
        client.embed(model, input).await
    }

    #[must_use]
    pub fn node_resources(&self) -> Vec<hydra_core::node::Node> {
        self.registry.all_snapshots()
    }
}

/// A static fallback chain keyed by exact model name, the simplest
/// implementation of [`FallbackProvider`]; `hydra-dispatcher` supplies a
/// richer one derived from its per-task-type preferred model lists.
#[derive(Debug, Clone, Default)]
pub struct StaticFallbackChain(pub HashMap<String, String>);

impl FallbackProvider for StaticFallbackChain {
    fn smaller_model(&self, current_model: &str) -> Option<String> {
        self.0.get(current_model).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydra_core::node::{Node, NodeKind};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn host_port(server_uri: &str) -> (String, u16) {
        let stripped = server_uri.trim_start_matches("http://");
        let (host, port) = stripped.split_once(':').unwrap();
        (host.to_string(), port.parse().unwrap())
    }

    async fn pool_with_single_node(server_uri: &str) -> Pool {
        let registry = Arc::new(NodeRegistry::new());
        let (host, port) = host_port(server_uri);
        registry.upsert(Node::new("n1", host, port, NodeKind::Gpu));
        Pool::new(registry, PoolConfig::default())
    }

    #[tokio::test]
    async fn generate_returns_text_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "print(1+1)",
                "done": true
            })))
            .mount(&server)
            .await;

        let pool = pool_with_single_node(&server.uri()).await;
        let req = Request::new("print 1+1 in python").with_model("llama3.2:3b");
        let resp = pool.generate(&req).await.unwrap();
        assert_eq!(resp.text, "print(1+1)");
    }

    #[tokio::test]
    async fn generate_fails_over_to_second_node_on_transport_error() {
        let bad = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&bad)
            .await;
        let good = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "ok",
                "done": true
            })))
            .mount(&good)
            .await;

        let registry = Arc::new(NodeRegistry::new());
        let (bad_host, bad_port) = host_port(&bad.uri());
        let (good_host, good_port) = host_port(&good.uri());
        registry.upsert(Node::new("a", bad_host, bad_port, NodeKind::Gpu));
        registry.upsert(Node::new("b", good_host, good_port, NodeKind::Gpu));

        let pool = Pool::new(registry.clone(), PoolConfig::default());
        let req = Request::new("hello").with_model("llama3.2:3b").with_hints(
            hydra_core::request::RoutingHints {
                node_id: None,
                ..Default::default()
            },
        );
        let resp = pool.generate(&req).await.unwrap();
        assert_eq!(resp.text, "ok");

        let a = registry.snapshot(&NodeId::new("a")).unwrap();
        assert_eq!(a.failure_count, 1);
    }
}
