use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::AuthError;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const WELL_KNOWN_FILE: &str = "application_default_credentials.json";

#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    pub fn token_uri(&self) -> &str {
        non_empty(self.token_uri.as_deref()).unwrap_or(DEFAULT_TOKEN_URI)
    }
}

#[derive(Clone, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default)]
    pub quota_project_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl AuthorizedUser {
    pub fn token_uri(&self) -> &str {
        non_empty(self.token_uri.as_deref()).unwrap_or(DEFAULT_TOKEN_URI)
    }
}

#[derive(Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialsFile {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
}

impl CredentialsFile {
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let contents = std::fs::read_to_string(path).map_err(|source| AuthError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &contents)
    }

    pub fn parse(path: &Path, contents: &str) -> Result<Self, AuthError> {
        #[derive(Deserialize)]
        struct TypeTag {
            #[serde(rename = "type", default)]
            kind: Option<String>,
        }

        let tag: TypeTag = serde_json::from_str(contents).map_err(|source| AuthError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        match tag.kind.as_deref() {
            Some("service_account") | Some("authorized_user") => {}
            other => {
                return Err(AuthError::UnsupportedCredentialType(
                    other.unwrap_or("<missing>").to_string(),
                ))
            }
        }
        serde_json::from_str(contents).map_err(|source| AuthError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CredentialsFile::ServiceAccount(_) => "service_account",
            CredentialsFile::AuthorizedUser(_) => "authorized_user",
        }
    }

    // User credentials only carry a quota project.
    pub fn project_id(&self) -> Option<String> {
        let raw = match self {
            CredentialsFile::ServiceAccount(key) => key.project_id.as_deref(),
            CredentialsFile::AuthorizedUser(user) => user.quota_project_id.as_deref(),
        };
        non_empty(raw).map(str::to_string)
    }
}

/// Location gcloud writes `auth application-default login` output to.
pub fn well_known_path<F>(lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
    if let Some(dir) = var("CLOUDSDK_CONFIG") {
        return Some(PathBuf::from(dir.trim()).join(WELL_KNOWN_FILE));
    }
    if cfg!(windows) {
        return var("APPDATA")
            .map(|dir| PathBuf::from(dir.trim()).join("gcloud").join(WELL_KNOWN_FILE));
    }
    var("HOME").map(|home| {
        PathBuf::from(home.trim())
            .join(".config")
            .join("gcloud")
            .join(WELL_KNOWN_FILE)
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
