//! `hydra benchmark`: issues N synthetic `generate` calls against every
//! registered node directly (bypassing the Router, so every node is
//! actually exercised) and reports per-node latency/success-rate.
//! Grounded on `dashflow-cli/src/commands/profile.rs`'s profiling-report
//! idiom, and on the original `scripts/benchmark_cluster.py`.

use clap::Args;
use colored::Colorize;

use crate::context::AppContext;
use crate::output::{create_table, print_info};
use hydra_client::BackendClient;
use hydra_core::request::GenerationOptions;

#[derive(Args)]
pub struct BenchmarkArgs {
    /// Number of generate calls to issue per node.
    #[arg(short = 'n', long, default_value = "5")]
    requests: u32,

    /// Model to benchmark against.
    #[arg(short, long, default_value = "llama3.2:3b")]
    model: String,

    /// Prompt to send on every call.
    #[arg(long, default_value = "Say hello in one word.")]
    prompt: String,
}

struct NodeBenchmark {
    node_id: String,
    successes: u32,
    failures: u32,
    durations_ms: Vec<u64>,
}

impl NodeBenchmark {
    fn avg_ms(&self) -> f64 {
        if self.durations_ms.is_empty() {
            return 0.0;
        }
        self.durations_ms.iter().sum::<u64>() as f64 / self.durations_ms.len() as f64
    }

    fn success_rate(&self) -> f64 {
        let total = self.successes + self.failures;
        if total == 0 {
            0.0
        } else {
            f64::from(self.successes) / f64::from(total)
        }
    }
}

pub async fn run(args: BenchmarkArgs, ctx: &AppContext) -> hydra_core::Result<()> {
    let nodes = ctx.pool.node_resources();
    if nodes.is_empty() {
        print_info("No nodes discovered, nothing to benchmark.");
        return Ok(());
    }

    print_info(&format!("Benchmarking {} node(s) with {} request(s) each...", nodes.len(), args.requests));

    let mut results = Vec::with_capacity(nodes.len());
    for node in &nodes {
        let client = BackendClient::new(node.url());
        let mut bench = NodeBenchmark { node_id: node.id.0.clone(), successes: 0, failures: 0, durations_ms: Vec::new() };
        for _ in 0..args.requests {
            match client.generate(&args.model, &args.prompt, &GenerationOptions::default()).await {
                Ok(outcome) => {
                    bench.successes += 1;
                    bench.durations_ms.push(outcome.duration_ms);
                }
                Err(_) => bench.failures += 1,
            }
        }
        results.push(bench);
    }

    let mut table = create_table();
    table.set_header(vec!["Node", "Requests", "Success Rate", "Avg Latency"]);
    for bench in &results {
        let rate = format!("{:.0}%", bench.success_rate() * 100.0);
        let rate = if bench.success_rate() < 1.0 { rate.bright_yellow().to_string() } else { rate.bright_green().to_string() };
        table.add_row(vec![
            bench.node_id.clone(),
            format!("{}", bench.successes + bench.failures),
            rate,
            format!("{:.0}ms", bench.avg_ms()),
        ]);
    }
    println!("{table}");
    Ok(())
}
