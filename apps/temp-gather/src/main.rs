use anyhow::{Context, Result};
use clap::Parser;

use temp_gather::cli::Cli;
use temp_gather::config::Config;
use temp_gather::datastore::Entity;
use temp_gather::gather;

fn init_tracing() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,temp_gather=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env(&cli.overrides())?;
    init_tracing()?;
    tracing::debug!(config = ?config, "configuration resolved");

    let client = gather::connect(&config)?;
    let data = gather::gather(&client, &config.kind, config.gather_options())
        .with_context(|| format!("failed to fetch {} records", config.kind))?;

    if cli.json {
        let rendered: Vec<serde_json::Value> = data.iter().map(Entity::to_json).collect();
        println!("{}", serde_json::to_string_pretty(&rendered)?);
    } else {
        println!(
            "fetched {} {} records from project {}",
            data.len(),
            config.kind,
            client.project_id()
        );
    }
    Ok(())
}
