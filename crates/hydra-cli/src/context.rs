//! Shared setup for every subcommand: load configuration, discover the
//! configured nodes, and build the Pool Facade on top of them.

use std::sync::Arc;

use hydra_core::config::HydraConfig;
use hydra_core::Result;
use hydra_dispatcher::{DispatcherFallback, ModelChains};
use hydra_pool::{Pool, PoolConfig};
use hydra_registry::discovery::{discover_static, StaticNodeSpec};
use hydra_registry::NodeRegistry;

pub struct AppContext {
    pub config: HydraConfig,
    pub registry: Arc<NodeRegistry>,
    pub pool: Arc<Pool>,
}

impl AppContext {
    pub async fn build() -> Result<Self> {
        let config = HydraConfig::load()?;
        let registry = Arc::new(NodeRegistry::new());

        let specs: Vec<StaticNodeSpec> = if config.manual_nodes.is_empty() {
            StaticNodeSpec::parse("localhost:11434").into_iter().collect()
        } else {
            config.manual_nodes.iter().filter_map(|s| StaticNodeSpec::parse(s)).collect()
        };
        if config.discovery_enabled {
            discover_static(&registry, &specs).await;
        }

        // TaskType::Generate's chain is a reasonable cluster-wide default
        // fallback; per-request dispatch still builds a task-specific one.
        let chains = ModelChains::default();
        let fallback = Arc::new(DispatcherFallback::for_task(&chains, hydra_core::task::TaskType::Generate));
        let pool = Arc::new(Pool::new(registry.clone(), PoolConfig::default()).with_fallback_provider(fallback));

        Ok(Self { config, registry, pool })
    }
}
