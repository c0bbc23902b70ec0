// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

use ndvi_stats::cli::{Cli, Commands};
use ndvi_stats::{ErrorResponse, QueryPipeline, QueryRequest};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let logs = fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr);
    if cli.json_logs {
        logs.json().init();
    } else {
        logs.init();
    }

    let request = match &cli.command {
        Commands::Query { date, geometry } => {
            let text = std::fs::read_to_string(geometry)
                .with_context(|| format!("reading {}", geometry.display()))?;
            QueryRequest {
                date: *date,
                geometry: serde_json::from_str(&text)
                    .with_context(|| format!("parsing {}", geometry.display()))?,
            }
        }
        Commands::Request { input } => {
            let mut text = String::new();
            if input.as_os_str() == "-" {
                std::io::stdin().read_to_string(&mut text)?;
            } else {
                text = std::fs::read_to_string(input)
                    .with_context(|| format!("reading {}", input.display()))?;
            }
            serde_json::from_str(&text).context("parsing request payload")?
        }
    };

    let pipeline = QueryPipeline::remote(cli.config()?)?;

    match pipeline.run(&request) {
        Ok(stats) => {
            println!("{}", serde_json::to_string(&stats)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            error!(kind = ?err.kind(), "{err}");
            println!("{}", serde_json::to_string(&ErrorResponse::from(&err))?);
            Ok(if err.kind().is_user_visible() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
