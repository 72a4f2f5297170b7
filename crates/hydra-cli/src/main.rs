// Allow clippy warnings for CLI application
#![allow(clippy::unwrap_used, clippy::expect_used)]

use clap::{Parser, Subcommand};

mod commands;
mod context;
mod output;

use commands::{benchmark, health, list_nodes, serve_api};
use context::AppContext;
use hydra_core::error::ErrorKind;
use output::print_error;

/// Unified Hydra CLI: serve the node pool over HTTP, or run diagnostics
/// against it directly.
#[derive(Parser)]
#[command(name = "hydra")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Distributed LLM inference orchestration over Ollama-style nodes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expose the Pool/Orchestrator API over HTTP.
    ServeApi(serve_api::ServeApiArgs),
    /// List every discovered node's live state.
    ListNodes(list_nodes::ListNodesArgs),
    /// Probe the cluster and report whether any node is healthy.
    Health(health::HealthArgs),
    /// Issue synthetic requests against every node and report latency/success-rate.
    Benchmark(benchmark::BenchmarkArgs),
}

/// Exit codes per spec.md §6: `0` success, `1` generic error, `2`
/// misconfiguration, `3` no healthy nodes.
fn exit_code_for(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::NoHealthyNodes => 3,
        ErrorKind::Configuration => 2,
        _ => 1,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let tracing_config = hydra_observability::TracingConfig::default();
    if let Err(err) = hydra_observability::init_tracing(&tracing_config) {
        eprintln!("failed to initialize tracing: {err}");
    }

    let ctx = match AppContext::build().await {
        Ok(ctx) => ctx,
        Err(err) => {
            print_error(&err.context.message);
            std::process::exit(exit_code_for(err.kind()));
        }
    };

    let result = match cli.command {
        Commands::ServeApi(args) => serve_api::run(args, ctx).await,
        Commands::ListNodes(args) => list_nodes::run(args, &ctx).await,
        Commands::Health(args) => health::run(args, &ctx).await,
        Commands::Benchmark(args) => benchmark::run(args, &ctx).await,
    };

    if let Err(err) = result {
        print_error(&err.context.message);
        std::process::exit(exit_code_for(err.kind()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clap_parses_known_subcommands() {
        let cli = Cli::try_parse_from(["hydra", "list-nodes"]).expect("parse list-nodes");
        assert!(matches!(cli.command, Commands::ListNodes(_)));

        let cli = Cli::try_parse_from(["hydra", "serve-api", "--bind", "127.0.0.1:9000"]).expect("parse serve-api");
        assert!(matches!(cli.command, Commands::ServeApi(_)));
    }

    #[test]
    fn exit_codes_follow_the_taxonomy() {
        assert_eq!(exit_code_for(ErrorKind::NoHealthyNodes), 3);
        assert_eq!(exit_code_for(ErrorKind::Configuration), 2);
        assert_eq!(exit_code_for(ErrorKind::Transport), 1);
    }
}
