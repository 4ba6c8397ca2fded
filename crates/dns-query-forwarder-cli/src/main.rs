// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use dns_query_forwarder::{
    config::{ForwarderConfig, DEFAULT_LOG_FILE},
    oplog::{self, Formatter},
    pipeline::Pipeline,
    sink::TracingSink,
};

#[derive(Parser, Debug)]
#[command(name = "dns-query-forwarder")]
#[command(about = "Forward DNS query logs to a collector API and report top talkers", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a query log, ship it in chunks and print the stats report as JSON
    Forward {
        /// DNS query log to process
        input: PathBuf,
    },
    /// Print the operational log as a JSON array of {date, level, message}
    ViewLogs {
        #[arg(long, env = "DNS_FORWARDER_LOG_FILE", default_value = DEFAULT_LOG_FILE)]
        log_file: PathBuf,
    },
}

#[tokio::main]
pub async fn main() -> ExitCode {
    let args = Args::parse();
    match args.command {
        Command::Forward { input } => forward(&input).await,
        Command::ViewLogs { log_file } => view_logs(&log_file),
    }
}

async fn forward(input: &Path) -> ExitCode {
    let config = match ForwarderConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config) {
        eprintln!("Error setting up operational log {}: {e}", config.log_file.display());
        return ExitCode::FAILURE;
    }
    debug!("Logging subsystem enabled: {config:?}");

    let pipeline = Pipeline::from_config(&config, Arc::new(TracingSink));
    match pipeline.run_file(input).await {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Failed to render stats report: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!("Processing of {} failed: {e}", input.display());
            eprintln!("Processing failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &ForwarderConfig) -> Result<(), Box<dyn std::error::Error>> {
    let file = oplog::open_log_file(&config.log_file)?;
    let env_filter = format!(
        "h2=off,hyper=off,rustls=off,reqwest=off,{}",
        config.log_level
    );

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_new(env_filter)?)
        .event_format(Formatter)
        .with_writer(Mutex::new(file))
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn view_logs(log_file: &Path) -> ExitCode {
    let entries = match oplog::read_log_file(log_file) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Unable to read {}: {e}", log_file.display());
            return ExitCode::FAILURE;
        }
    };
    match serde_json::to_string_pretty(&entries) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to render log entries: {e}");
            ExitCode::FAILURE
        }
    }
}
