//! `hydra health`: runs one health-monitor probe pass and reports whether
//! the cluster has at least one healthy node (spec.md §4.2, §6).

use clap::Args;

use crate::context::AppContext;
use crate::output::{print_error, print_success};
use hydra_core::Error;
use hydra_registry::{HealthMonitor, HealthMonitorConfig};

#[derive(Args)]
pub struct HealthArgs {}

pub async fn run(_args: HealthArgs, ctx: &AppContext) -> hydra_core::Result<()> {
    let monitor = HealthMonitor::new(ctx.registry.clone(), HealthMonitorConfig::default());
    monitor.probe_once().await;

    let healthy_ids = monitor.healthy_node_ids();
    if healthy_ids.is_empty() {
        print_error("no healthy nodes");
        return Err(Error::no_healthy_nodes("health probe found no healthy node in the pool"));
    }

    print_success(&format!("{} healthy node(s): {}", healthy_ids.len(), healthy_ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")));
    Ok(())
}
