use clap::Parser;
use std::path::PathBuf;

use crate::config::ConfigOverrides;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "temp-gather",
    version,
    about = "Fetch every record of one Datastore kind into memory"
)]
pub struct Cli {
    /// Project id (default: environment, credentials file, or metadata server).
    #[arg(long)]
    pub project: Option<String>,
    /// Datastore namespace; the default namespace when omitted.
    #[arg(long)]
    pub namespace: Option<String>,
    /// Kind to fetch (defaults to TemperatureRecord).
    #[arg(long)]
    pub kind: Option<String>,
    /// Entities requested per round trip.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub page_size: Option<u32>,
    /// Stop after this many entities.
    #[arg(long)]
    pub limit: Option<u32>,
    /// Override the Datastore API base URL.
    #[arg(long)]
    pub endpoint: Option<String>,
    /// Credentials JSON (service_account or authorized_user).
    #[arg(long)]
    pub credentials: Option<PathBuf>,
    /// Print the fetched records as a JSON array instead of a summary.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            project_id: self.project.clone(),
            namespace: self.namespace.clone(),
            kind: self.kind.clone(),
            page_size: self.page_size,
            limit: self.limit,
            endpoint: self.endpoint.clone(),
            credentials_path: self.credentials.clone(),
        }
    }
}
