mod config;
mod github;
mod pipeline;
mod review;

use clap::Parser;
use colored::Colorize;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pipeline::{InvocationRequest, InvocationResponse, PipelineError};

/// PR Reviewer: fetches a GitHub Pull Request diff, asks a chat-completion
/// model to review it, and posts the feedback as a PR comment.
///
/// The invocation payload is JSON:
/// {"repositoryName": "owner/repo", "pullRequestNumber": "42"}
#[derive(Parser, Debug)]
#[command(name = "pr-reviewer", version, about)]
struct Cli {
    /// Invocation payload as an inline JSON string
    #[arg(long, conflicts_with = "payload_file")]
    payload: Option<String>,

    /// Read the invocation payload from a file instead (stdin when neither is given)
    #[arg(long)]
    payload_file: Option<PathBuf>,

    /// Path to a TOML config file (defaults to ./.pr-reviewer.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli).await {
        Ok((request, response)) => {
            println!("{}", serde_json::to_string(&response)?);
            eprintln!(
                "{} review posted on {}#{}",
                "✓".green().bold(),
                request.repository_name,
                request.pull_request_number
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            error!(kind = %err.kind(), error = %err, "invocation failed");
            println!("{}", serde_json::to_string(&err.to_failure())?);
            eprintln!("{} {} ({})", "✗".red().bold(), err, err.kind().to_string().yellow());
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Read the payload and config, then run the pipeline. Every failure on the
/// way comes back as a `PipelineError` so it gets a failure record.
async fn run(cli: &Cli) -> Result<(InvocationRequest, InvocationResponse), PipelineError> {
    let raw_payload = read_payload(cli)
        .map_err(|e| PipelineError::InvalidRequest(format!("cannot read payload: {e}")))?;
    let request = pipeline::parse_request(&raw_payload)?;

    info!("loading configuration");
    let config = config::Config::load(cli.config.as_deref())?;

    let response = pipeline::invoke(&config, &request).await?;
    Ok((request, response))
}

fn read_payload(cli: &Cli) -> std::io::Result<String> {
    match (&cli.payload, &cli.payload_file) {
        (Some(inline), _) => Ok(inline.clone()),
        (None, Some(path)) => std::fs::read_to_string(path),
        (None, None) => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}
