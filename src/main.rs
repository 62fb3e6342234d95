//! # lwwset
//!
//! Gossip stress harness for the LWW-Set CRDT. Replicas accept local adds and
//! removes concurrently, then exchange encoded state in random pairs and
//! re-forward the minimal deltas until every replica holds the same set.

use clap::{Args, Parser, Subcommand};
use std::env;
use stress_test::{stress_test_scaling, stress_test_set, StressConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};


// ─── CLI ───────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "lwwset")]
#[command(about = "Concurrent gossip stress test for the LWW-Set CRDT")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one stress test with the given shape
    Run(RunArgs),
    /// Repeat a small stress test with a growing number of replicas
    Scaling {
        /// Largest replica count to try
        #[arg(long, default_value_t = 20)]
        max_replicas: usize,
        /// Replica count increment between runs
        #[arg(long, default_value_t = 2)]
        step: usize,
        /// RNG seed shared by every run
        #[arg(long, default_value_t = 7)]
        seed: u64,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Number of replicas
    #[arg(long, default_value_t = 8)]
    replicas: usize,
    /// Local operations issued by each replica
    #[arg(long, default_value_t = 500)]
    ops: usize,
    /// Random pairwise syncs before the final full round
    #[arg(long, default_value_t = 1000)]
    syncs: usize,
    /// Probability that an operation also removes an older key
    #[arg(long, default_value_t = 0.3, value_parser = parse_ratio)]
    remove_ratio: f64,
    /// Tombstone retention in clock ticks
    #[arg(long, default_value_t = 10_000)]
    gc_cutoff: i64,
    /// RNG seed for operations and sync pairs
    #[arg(long, default_value_t = 7)]
    seed: u64,
}

impl From<RunArgs> for StressConfig {
    fn from(args: RunArgs) -> Self {
        StressConfig {
            num_replicas: args.replicas,
            ops_per_replica: args.ops,
            num_syncs: args.syncs,
            remove_ratio: args.remove_ratio,
            gc_cutoff: args.gc_cutoff,
            seed: args.seed,
        }
    }
}

/// A probability in `[0, 1]`; NaN and infinities are refused.
fn parse_ratio(arg: &str) -> Result<f64, String> {
    let ratio: f64 = arg.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&ratio) {
        Ok(ratio)
    } else {
        Err(format!("{ratio} is not a probability between 0 and 1"))
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("LWWSET_LOG")
        .unwrap_or_else(|_| EnvFilter::new("lwwset=info,lwwset_core=info"));
    let registry = tracing_subscriber::registry().with(filter);
    if env::var("LWWSET_LOG_FORMAT").is_ok_and(|f| f == "json") {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        match cli.command {
            Commands::Run(args) => {
                let stats = stress_test_set(args.into()).await?;
                stats.print();
            }
            Commands::Scaling {
                max_replicas,
                step,
                seed,
            } => stress_test_scaling(max_replicas, step, seed).await?,
        }
        println!("\n✓ All stress tests completed successfully!");
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_ratio_must_be_a_probability() {
        assert_eq!(parse_ratio("0.25"), Ok(0.25));
        assert_eq!(parse_ratio("1"), Ok(1.0));
        assert!(parse_ratio("NaN").is_err());
        assert!(parse_ratio("inf").is_err());
        assert!(parse_ratio("1.5").is_err());
        assert!(parse_ratio("-0.1").is_err());
        assert!(parse_ratio("often").is_err());
    }

    #[test]
    fn test_cli_rejects_nan_ratio() {
        let parsed = Cli::try_parse_from(["lwwset", "run", "--remove-ratio", "NaN"]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from(["lwwset", "run", "--remove-ratio", "0.5"]).unwrap();
        assert!(matches!(parsed.command, Commands::Run(RunArgs { remove_ratio, .. }) if remove_ratio == 0.5));
    }
}
