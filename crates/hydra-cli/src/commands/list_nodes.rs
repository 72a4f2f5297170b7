//! `hydra list-nodes`: tabular dump of every discovered node's live state
//! (spec.md §6 "diagnostic" subcommands).

use clap::Args;
use colored::Colorize;

use crate::context::AppContext;
use crate::output::{create_table, print_info};

#[derive(Args)]
pub struct ListNodesArgs {
    /// Output as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

pub async fn run(args: ListNodesArgs, ctx: &AppContext) -> hydra_core::Result<()> {
    let nodes = ctx.pool.node_resources();

    if args.json {
        let json = serde_json::json!(nodes
            .iter()
            .map(|n| {
                serde_json::json!({
                    "id": n.id.0,
                    "host": n.host,
                    "port": n.port,
                    "kind": format!("{:?}", n.kind),
                    "healthy": n.healthy,
                    "active_requests": n.active_requests,
                    "max_concurrent": n.max_concurrent,
                    "success_rate": n.success_rate(),
                    "avg_latency_ms": n.avg_latency_ms(),
                })
            })
            .collect::<Vec<_>>());
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    if nodes.is_empty() {
        print_info("No nodes discovered.");
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Id", "Address", "Kind", "Healthy", "Active/Max", "Success Rate", "Avg Latency"]);
    for node in &nodes {
        let healthy = if node.healthy { "yes".bright_green().to_string() } else { "no".bright_red().to_string() };
        table.add_row(vec![
            node.id.0.clone(),
            node.url(),
            format!("{:?}", node.kind),
            healthy,
            format!("{}/{}", node.active_requests, node.max_concurrent),
            format!("{:.0}%", node.success_rate() * 100.0),
            format!("{:.0}ms", node.avg_latency_ms()),
        ]);
    }
    println!("{table}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_no_nodes_when_registry_is_empty() {
        let registry = std::sync::Arc::new(hydra_registry::NodeRegistry::new());
        let pool = std::sync::Arc::new(hydra_pool::Pool::new(registry.clone(), hydra_pool::PoolConfig::default()));
        let ctx = AppContext { config: hydra_core::config::HydraConfig::default(), registry, pool };
        let result = run(ListNodesArgs { json: true }, &ctx).await;
        assert!(result.is_ok());
    }
}
