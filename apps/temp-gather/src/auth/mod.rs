pub mod credentials;
pub mod oauth;

use chrono::{Duration as ChronoDuration, Utc};
use reqwest::blocking::Client as HttpClient;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::AuthError;
use credentials::CredentialsFile;
use oauth::AccessToken;

const REFRESH_MARGIN_SECS: i64 = 60;

pub trait TokenSource: Send + Sync {
    // `None` means send no Authorization header (emulator).
    fn token(&self) -> Result<Option<String>, AuthError>;

    fn describe(&self) -> &'static str;
}

pub struct Anonymous;

impl TokenSource for Anonymous {
    fn token(&self) -> Result<Option<String>, AuthError> {
        Ok(None)
    }

    fn describe(&self) -> &'static str {
        "anonymous"
    }
}

pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenSource for StaticToken {
    fn token(&self) -> Result<Option<String>, AuthError> {
        Ok(Some(self.0.clone()))
    }

    fn describe(&self) -> &'static str {
        "access_token"
    }
}

enum TokenFlow {
    ServiceAccount(credentials::ServiceAccountKey),
    AuthorizedUser(credentials::AuthorizedUser),
    Metadata { host: String },
}

/// Fetches OAuth2 access tokens and reuses them until shortly before expiry.
pub struct OAuthTokenSource {
    http: HttpClient,
    flow: TokenFlow,
    cache: Mutex<Option<AccessToken>>,
}

impl OAuthTokenSource {
    fn new(http: HttpClient, flow: TokenFlow) -> Self {
        Self {
            http,
            flow,
            cache: Mutex::new(None),
        }
    }

    fn fetch(&self) -> Result<AccessToken, AuthError> {
        match &self.flow {
            TokenFlow::ServiceAccount(key) => oauth::service_account_token(&self.http, key),
            TokenFlow::AuthorizedUser(user) => oauth::refresh_token(&self.http, user),
            TokenFlow::Metadata { host } => oauth::metadata_token(&self.http, host),
        }
    }
}

pub(crate) fn is_fresh(token: &AccessToken, now: chrono::DateTime<Utc>) -> bool {
    token.expires_at - ChronoDuration::seconds(REFRESH_MARGIN_SECS) > now
}

impl TokenSource for OAuthTokenSource {
    fn token(&self) -> Result<Option<String>, AuthError> {
        let mut cache = self
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(token) = cache.as_ref().filter(|token| is_fresh(token, Utc::now())) {
            return Ok(Some(token.value.clone()));
        }
        let token = self.fetch()?;
        tracing::debug!(
            flow = self.describe(),
            expires_at = %token.expires_at,
            "fetched access token"
        );
        let value = token.value.clone();
        *cache = Some(token);
        Ok(Some(value))
    }

    fn describe(&self) -> &'static str {
        match self.flow {
            TokenFlow::ServiceAccount(_) => "service_account",
            TokenFlow::AuthorizedUser(_) => "authorized_user",
            TokenFlow::Metadata { .. } => "metadata_server",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiscoveryInputs {
    pub emulator: bool,
    pub access_token: Option<String>,
    pub credentials_path: Option<PathBuf>,
    pub well_known_path: Option<PathBuf>,
    pub metadata_host: String,
}

pub enum Credentials {
    Anonymous,
    AccessToken(String),
    File {
        path: PathBuf,
        file: CredentialsFile,
    },
    Metadata {
        host: String,
    },
}

impl Credentials {
    pub fn describe(&self) -> &'static str {
        match self {
            Credentials::Anonymous => "anonymous",
            Credentials::AccessToken(_) => "access_token",
            Credentials::File { file, .. } => file.kind(),
            Credentials::Metadata { .. } => "metadata_server",
        }
    }

    pub fn project_id(&self) -> Option<String> {
        match self {
            Credentials::File { file, .. } => file.project_id(),
            _ => None,
        }
    }

    pub fn into_token_source(self, http: HttpClient) -> Box<dyn TokenSource> {
        match self {
            Credentials::Anonymous => Box::new(Anonymous),
            Credentials::AccessToken(token) => Box::new(StaticToken::new(token)),
            Credentials::File { file, .. } => {
                let flow = match file {
                    CredentialsFile::ServiceAccount(key) => TokenFlow::ServiceAccount(key),
                    CredentialsFile::AuthorizedUser(user) => TokenFlow::AuthorizedUser(user),
                };
                Box::new(OAuthTokenSource::new(http, flow))
            }
            Credentials::Metadata { host } => {
                Box::new(OAuthTokenSource::new(http, TokenFlow::Metadata { host }))
            }
        }
    }
}

pub fn discover(inputs: &DiscoveryInputs) -> Result<Credentials, AuthError> {
    if inputs.emulator {
        return Ok(Credentials::Anonymous);
    }
    if let Some(token) = inputs
        .access_token
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return Ok(Credentials::AccessToken(token.to_string()));
    }
    // An explicitly named file must load; a missing well-known file just
    // falls through to the metadata server.
    if let Some(path) = &inputs.credentials_path {
        let file = CredentialsFile::load(path)?;
        return Ok(Credentials::File {
            path: path.clone(),
            file,
        });
    }
    if let Some(path) = inputs.well_known_path.as_ref().filter(|path| path.exists()) {
        let file = CredentialsFile::load(path)?;
        return Ok(Credentials::File {
            path: path.clone(),
            file,
        });
    }
    Ok(Credentials::Metadata {
        host: inputs.metadata_host.clone(),
    })
}
