//! CLI wrapper around the scanning core: run one scan to completion.
//!
//! Exit codes: 0 on success, 2 on invalid arguments, 3 when the scan
//! job ends in a failed state.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use scanner::client::{ClientConfig, HttpTransport};
use scanner::engine::ScanEngine;
use scanner::jobs::{JobManager, SubmitOptions};
use scanner::limits::{LimiterConfig, RateController};
use scanner::providers::{builtin_code_drivers, DriverSettings};
use scanner::registry::Registry;
use scanner::types::{JobState, ProbeStatus};
use scanner::ScanError;

const EXIT_INVALID_ARGS: u8 = 2;
const EXIT_JOB_FAILED: u8 = 3;

#[derive(Parser)]
#[command(name = "scanctl", about = "Username-discovery scanner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan providers for a username and stream results
    Scan {
        username: String,

        /// Comma-separated provider subset (default: all)
        #[arg(long, value_delimiter = ',')]
        providers: Vec<String>,

        /// Extra provider descriptor YAML, merged after the builtin set
        #[arg(long)]
        providers_file: Option<PathBuf>,

        /// SOCKS5h proxy for .onion hosts
        #[arg(long)]
        socks_proxy: Option<String>,

        /// Global outbound concurrency cap
        #[arg(long, default_value_t = 6)]
        concurrency: usize,

        /// Print the final job as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List the providers the registry would load
    Providers {
        #[arg(long)]
        providers_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Scan {
            username,
            providers,
            providers_file,
            socks_proxy,
            concurrency,
            json,
        } => {
            run_scan(
                &username,
                providers,
                providers_file,
                socks_proxy,
                concurrency,
                json,
            )
            .await
        }
        Command::Providers { providers_file } => {
            let registry = build_registry(providers_file, &DriverSettings::default());
            for name in registry.names() {
                println!("{name}");
            }
            ExitCode::SUCCESS
        }
    }
}

fn build_registry(providers_file: Option<PathBuf>, settings: &DriverSettings) -> Arc<Registry> {
    let mut builder = Registry::builder()
        .with_code_drivers(builtin_code_drivers(settings))
        .with_builtin();
    if let Some(path) = providers_file {
        builder = builder.with_file(path);
    }
    Arc::new(builder.build())
}

async fn run_scan(
    username: &str,
    providers: Vec<String>,
    providers_file: Option<PathBuf>,
    socks_proxy: Option<String>,
    concurrency: usize,
    json: bool,
) -> ExitCode {
    let transport = match HttpTransport::new(&ClientConfig { socks_proxy }) {
        Ok(transport) => Arc::new(transport),
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let settings = DriverSettings {
        hibp_api_key: std::env::var("HIBP_API_KEY").ok(),
    };
    let registry = build_registry(providers_file, &settings);
    let limiter = Arc::new(RateController::new(
        &LimiterConfig::default().with_global_limit(concurrency),
    ));
    let engine = Arc::new(ScanEngine::new(transport, limiter).with_settings(settings));
    let manager = JobManager::new(registry, engine);

    let job_id = match manager.submit(
        username,
        SubmitOptions {
            providers,
            ..Default::default()
        },
    ) {
        Ok(id) => id,
        Err(err @ ScanError::InvalidUsername { .. }) => {
            eprintln!("error: {err}");
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    // stream results as they land; the list is append-only while running
    let mut printed = 0;
    let view = loop {
        let view = match manager.get(job_id, None) {
            Ok(view) => view,
            Err(err) => {
                eprintln!("error: {err}");
                return ExitCode::FAILURE;
            }
        };

        if !json {
            for result in &view.results[printed..] {
                let status = match result.status {
                    ProbeStatus::Found => "found",
                    ProbeStatus::NotFound => "not_found",
                    ProbeStatus::Unknown => "unknown",
                    ProbeStatus::Blocked => "blocked",
                    ProbeStatus::Error => "error",
                };
                println!(
                    "{:<18} {:<10} {:>6} ms  {}",
                    result.provider, status, result.elapsed_ms, result.url
                );
            }
        }
        printed = view.results.len();

        if view.state.is_terminal() {
            break view;
        }
        tokio::time::sleep(Duration::from_millis(150)).await;
    };

    if json {
        match serde_json::to_string_pretty(&view) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => eprintln!("error: {err}"),
        }
    } else {
        println!(
            "\n{} providers, {} found, {} failed",
            view.providers_count, view.found_count, view.failed_count
        );
    }

    match view.state {
        JobState::Done => ExitCode::SUCCESS,
        _ => {
            if let Some(error) = &view.error {
                eprintln!("scan failed: {error}");
            }
            ExitCode::from(EXIT_JOB_FAILED)
        }
    }
}
