use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::auth::credentials::well_known_path;
use crate::auth::oauth::DEFAULT_METADATA_HOST;
use crate::auth::DiscoveryInputs;
use crate::datastore::http::DEFAULT_ENDPOINT;
use crate::gather::{GatherOptions, KIND_TEMPERATURE_RECORD};
use crate::net::http_base_url;

const PROJECT_ID_VARS: [&str; 4] = [
    "TEMP_GATHER_PROJECT_ID",
    "DATASTORE_PROJECT_ID",
    "GOOGLE_CLOUD_PROJECT",
    "GCLOUD_PROJECT",
];

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub project_id: Option<String>,
    pub namespace: Option<String>,
    pub kind: Option<String>,
    pub page_size: Option<u32>,
    pub limit: Option<u32>,
    pub endpoint: Option<String>,
    pub credentials_path: Option<PathBuf>,
}

#[derive(Clone)]
pub struct Config {
    pub project_id: Option<String>,
    pub namespace: Option<String>,
    pub kind: String,
    pub page_size: Option<u32>,
    pub limit: Option<u32>,
    pub endpoint: Option<String>,
    pub emulator_host: Option<String>,
    pub timeout_secs: Option<u64>,
    pub credentials_path: Option<PathBuf>,
    pub well_known_credentials: Option<PathBuf>,
    pub access_token: Option<String>,
    pub metadata_host: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("project_id", &self.project_id)
            .field("namespace", &self.namespace)
            .field("kind", &self.kind)
            .field("page_size", &self.page_size)
            .field("limit", &self.limit)
            .field("endpoint", &self.endpoint)
            .field("emulator_host", &self.emulator_host)
            .field("timeout_secs", &self.timeout_secs)
            .field("credentials_path", &self.credentials_path)
            .field("well_known_credentials", &self.well_known_credentials)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("metadata_host", &self.metadata_host)
            .finish()
    }
}

impl Config {
    pub fn from_env(overrides: &ConfigOverrides) -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok(), overrides)
    }

    pub fn from_lookup<F>(lookup: F, overrides: &ConfigOverrides) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let project_id = non_empty(overrides.project_id.clone())
            .or_else(|| PROJECT_ID_VARS.iter().find_map(|key| var(*key)));
        let namespace =
            non_empty(overrides.namespace.clone()).or_else(|| var("DATASTORE_NAMESPACE"));
        let kind = non_empty(overrides.kind.clone())
            .or_else(|| var("TEMP_GATHER_KIND"))
            .unwrap_or_else(|| KIND_TEMPERATURE_RECORD.to_string());

        let page_size = match overrides.page_size {
            Some(value) => Some(value),
            None => parse_var::<u32>(&var, "TEMP_GATHER_PAGE_SIZE")?,
        }
        .filter(|value| *value != 0);
        let limit = match overrides.limit {
            Some(value) => Some(value),
            None => parse_var::<u32>(&var, "TEMP_GATHER_LIMIT")?,
        };
        let timeout_secs =
            parse_var::<u64>(&var, "TEMP_GATHER_TIMEOUT_SECS")?.filter(|value| *value != 0);

        let endpoint =
            non_empty(overrides.endpoint.clone()).or_else(|| var("TEMP_GATHER_ENDPOINT"));
        if let Some(endpoint) = &endpoint {
            Url::parse(endpoint)
                .with_context(|| format!("invalid datastore endpoint {endpoint}"))?;
        }
        let emulator_host = var("DATASTORE_EMULATOR_HOST");

        let credentials_path = overrides
            .credentials_path
            .clone()
            .or_else(|| var("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from));
        let well_known_credentials = well_known_path(&lookup);
        let access_token = var("GOOGLE_OAUTH_ACCESS_TOKEN");
        let metadata_host =
            var("GCE_METADATA_HOST").unwrap_or_else(|| DEFAULT_METADATA_HOST.to_string());

        Ok(Self {
            project_id,
            namespace,
            kind,
            page_size,
            limit,
            endpoint,
            emulator_host,
            timeout_secs,
            credentials_path,
            well_known_credentials,
            access_token,
            metadata_host,
        })
    }

    pub fn uses_emulator(&self) -> bool {
        self.emulator_host.is_some()
    }

    pub fn base_url(&self) -> Result<String> {
        let base = match (&self.endpoint, &self.emulator_host) {
            (Some(endpoint), _) => endpoint.clone(),
            (None, Some(host)) => http_base_url(host),
            (None, None) => DEFAULT_ENDPOINT.to_string(),
        };
        Url::parse(&base).with_context(|| format!("invalid datastore endpoint {base}"))?;
        Ok(base)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn gather_options(&self) -> GatherOptions {
        GatherOptions {
            page_size: self.page_size,
            limit: self.limit,
        }
    }

    pub fn discovery(&self) -> DiscoveryInputs {
        DiscoveryInputs {
            emulator: self.uses_emulator(),
            access_token: self.access_token.clone(),
            credentials_path: self.credentials_path.clone(),
            well_known_path: self.well_known_credentials.clone(),
            metadata_host: self.metadata_host.clone(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("invalid {key}: {raw:?}")),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)], overrides: &ConfigOverrides) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned(), overrides)
    }

    #[test]
    fn defaults_target_temperature_records_in_production() {
        let config = config_from(&[], &ConfigOverrides::default()).expect("config");
        assert_eq!(config.kind, "TemperatureRecord");
        assert_eq!(config.project_id, None);
        assert_eq!(config.namespace, None);
        assert_eq!(config.page_size, None);
        assert_eq!(config.limit, None);
        assert_eq!(config.timeout(), None);
        assert!(!config.uses_emulator());
        assert_eq!(config.base_url().expect("url"), DEFAULT_ENDPOINT);
        assert_eq!(config.metadata_host, DEFAULT_METADATA_HOST);
    }

    #[test]
    fn project_id_comes_from_first_non_blank_variable() {
        let config = config_from(
            &[
                ("TEMP_GATHER_PROJECT_ID", "  "),
                ("DATASTORE_PROJECT_ID", "emulated-project"),
                ("GOOGLE_CLOUD_PROJECT", "farm-temps"),
            ],
            &ConfigOverrides::default(),
        )
        .expect("config");
        assert_eq!(config.project_id.as_deref(), Some("emulated-project"));

        let config = config_from(&[("GCLOUD_PROJECT", "legacy")], &ConfigOverrides::default())
            .expect("config");
        assert_eq!(config.project_id.as_deref(), Some("legacy"));
    }

    #[test]
    fn cli_overrides_win_over_environment() {
        let overrides = ConfigOverrides {
            project_id: Some("cli-project".to_string()),
            kind: Some("HumidityRecord".to_string()),
            page_size: Some(50),
            limit: Some(10),
            credentials_path: Some(PathBuf::from("/keys/cli.json")),
            ..ConfigOverrides::default()
        };
        let config = config_from(
            &[
                ("GOOGLE_CLOUD_PROJECT", "env-project"),
                ("TEMP_GATHER_KIND", "Other"),
                ("TEMP_GATHER_PAGE_SIZE", "500"),
                ("GOOGLE_APPLICATION_CREDENTIALS", "/keys/env.json"),
            ],
            &overrides,
        )
        .expect("config");
        assert_eq!(config.project_id.as_deref(), Some("cli-project"));
        assert_eq!(config.kind, "HumidityRecord");
        assert_eq!(config.page_size, Some(50));
        assert_eq!(config.limit, Some(10));
        assert_eq!(config.credentials_path, Some(PathBuf::from("/keys/cli.json")));
    }

    #[test]
    fn emulator_host_switches_base_url_and_disables_auth() {
        let config = config_from(
            &[
                ("DATASTORE_EMULATOR_HOST", "localhost:8081"),
                ("GOOGLE_OAUTH_ACCESS_TOKEN", "ya29.ignored"),
            ],
            &ConfigOverrides::default(),
        )
        .expect("config");
        assert!(config.uses_emulator());
        assert_eq!(config.base_url().expect("url"), "http://localhost:8081");
        assert!(config.discovery().emulator);
    }

    #[test]
    fn explicit_endpoint_beats_emulator() {
        let config = config_from(
            &[
                ("DATASTORE_EMULATOR_HOST", "localhost:8081"),
                ("TEMP_GATHER_ENDPOINT", "https://datastore.example.test"),
            ],
            &ConfigOverrides::default(),
        )
        .expect("config");
        assert_eq!(
            config.base_url().expect("url"),
            "https://datastore.example.test"
        );
    }

    #[test]
    fn malformed_numbers_name_the_variable() {
        let err = config_from(
            &[("TEMP_GATHER_PAGE_SIZE", "lots")],
            &ConfigOverrides::default(),
        )
        .expect_err("invalid");
        assert!(err.to_string().contains("TEMP_GATHER_PAGE_SIZE"));

        let err = config_from(
            &[("TEMP_GATHER_ENDPOINT", "not a url")],
            &ConfigOverrides::default(),
        )
        .expect_err("invalid");
        assert!(err.to_string().contains("invalid datastore endpoint"));
    }

    #[test]
    fn zero_page_size_and_timeout_mean_unset() {
        let config = config_from(
            &[("TEMP_GATHER_PAGE_SIZE", "0"), ("TEMP_GATHER_TIMEOUT_SECS", "0")],
            &ConfigOverrides::default(),
        )
        .expect("config");
        assert_eq!(config.page_size, None);
        assert_eq!(config.timeout(), None);

        let config = config_from(
            &[("TEMP_GATHER_TIMEOUT_SECS", "45")],
            &ConfigOverrides::default(),
        )
        .expect("config");
        assert_eq!(config.timeout(), Some(Duration::from_secs(45)));
    }

    #[test]
    fn debug_output_redacts_access_token() {
        let config = config_from(
            &[("GOOGLE_OAUTH_ACCESS_TOKEN", "ya29.secret")],
            &ConfigOverrides::default(),
        )
        .expect("config");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("ya29.secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
