//! causal_agent demos
//!
//! # Synthetic Grid Bandit
//!
//! Runs the uncertainty-driven agent against the seeded synthetic bandit and
//! prints a summary.
//!
//! ```bash
//! # Monte-Carlo dropout estimator
//! cargo run --release -- dropout
//!
//! # Deep ensemble estimator, with an optional JSON config
//! cargo run --release -- ensemble demo.json
//!
//! # Agent log output (training notices, loss traces)
//! RUST_LOG=causal_agent=debug cargo run --release -- dropout
//! ```

mod synthetic_bandit;

use causal_agent::EstimatorKind;
use tracing_subscriber::EnvFilter;

fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].parse::<EstimatorKind>() {
            Ok(kind) => {
                let config_path = args.get(2).map(String::as_str);
                if let Err(e) = synthetic_bandit::run(kind, config_path) {
                    eprintln!("run failed: {}", e);
                    std::process::exit(1);
                }
            }
            Err(_) => {
                println!("Unknown estimator: {}", args[1]);
                println!();
                print_usage();
            }
        }
    } else {
        print_usage();
    }
}

/// Route the library's `log` records to stderr, filtered by `RUST_LOG`.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

fn print_usage() {
    println!("Usage: causal-agent-demo <estimator> [config.json]");
    println!();
    println!("Estimators:");
    println!("  dropout    Monte-Carlo dropout (stochastic forward passes)");
    println!("  ensemble   Deep ensemble (spread across independently trained members)");
    println!();
    println!("The optional JSON file may set \"agent\", \"env\", \"log_every\" and \"csv\".");
    println!("Set RUST_LOG (e.g. RUST_LOG=debug) to see agent log output.");
}
