//! circuit-guard
//!
//! Loads the dependency catalog, registers one circuit breaker per protected
//! dependency and reports what it built.
//!
//! # Architecture Overview
//!
//! ```text
//!     caller ──▶ CircuitBreakerRegistry.execute(name, op)
//!                      │
//!                      ▼
//!               CircuitBreaker.execute(op) ──▶ fallback / CircuitError::Open
//!                      │
//!                      ▼
//!               op() ──▶ error classifier ──▶ state transition
//!                      │
//!                      ▼
//!               result or original error
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;

use circuit_guard::catalog::Bootstrap;
use circuit_guard::config::{load_config, GuardConfig};
use circuit_guard::observability::{init_logging, init_metrics};
use circuit_guard::CircuitBreakerRegistry;

#[derive(Parser)]
#[command(name = "circuit-guard")]
#[command(about = "Circuit breaker catalog for external dependencies", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration and print the resolved catalog
    Check,
    /// Register all breakers and print their health and metrics
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => GuardConfig::default(),
    };

    init_logging(&config.observability);

    match run(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "circuit-guard failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, config: GuardConfig) -> Result<(), Box<dyn std::error::Error>> {
    let bootstrap = Bootstrap::new(config.catalog.clone());

    match command {
        Commands::Check => {
            for c in bootstrap.configs()? {
                let matchers: Vec<String> = c.expected_errors.iter().map(ToString::to_string).collect();
                println!(
                    "{:<16} threshold={:<3} recovery={:>6}ms window={:>7}ms fallback={:<5} expected=[{}]",
                    c.name,
                    c.failure_threshold,
                    c.recovery_timeout.as_millis(),
                    c.monitoring_window.as_millis(),
                    c.fallback.is_some(),
                    matchers.join(", ")
                );
            }
        }
        Commands::Status => {
            if config.observability.metrics_enabled {
                match config.observability.metrics_address.parse() {
                    Ok(addr) => init_metrics(addr),
                    Err(_) => tracing::error!(
                        metrics_address = %config.observability.metrics_address,
                        "Failed to parse metrics address"
                    ),
                }
            }

            let registry = CircuitBreakerRegistry::new();
            bootstrap.initialize(&registry)?;

            let report = json!({
                "health": registry.health_status(),
                "metrics": registry.all_metrics(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
