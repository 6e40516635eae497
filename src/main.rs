mod common;
mod config;
mod error;
mod executer;
mod jobs;
mod languages;
mod runner;
mod workspace;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use crate::config::RunnerConfig;
use crate::jobs::run::handle_request;
use crate::languages::LanguageRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // stdout carries the response, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("code_runner=warn")),
        )
        .init();

    let config = RunnerConfig::from_env()?;
    let registry =
        LanguageRegistry::load(config.languages_path.as_deref(), config.compile_timeout)?;
    debug!("Supported languages: {:?}", registry.languages());

    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Failed to read request from stdin")?;

    match handle_request(&input, &registry, &config).await {
        Ok(output) => {
            println!("{}", output.to_json()?);
            Ok(())
        }
        Err(e) => {
            error!("Request rejected: {}", e);
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
