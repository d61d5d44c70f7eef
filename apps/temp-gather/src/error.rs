use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatastoreError {
    #[error("datastore request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("datastore returned HTTP {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("failed to decode datastore response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("query for kind {kind} stalled after page {page}: no new end cursor")]
    StalledCursor { kind: String, page: usize },
    #[error("query for kind {kind} returned no usable moreResults state on page {page}")]
    UnexpectedMoreResults { kind: String, page: usize },
    #[error(transparent)]
    Auth(#[from] AuthError),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to read credentials file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse credentials file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("unsupported credential type {0:?}")]
    UnsupportedCredentialType(String),
    #[error("failed to sign service account assertion: {0}")]
    Sign(#[from] jsonwebtoken::errors::Error),
    #[error("token request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },
    #[error("token endpoint {url} returned HTTP {status}: {body}")]
    Endpoint { url: String, status: u16, body: String },
    #[error("token endpoint {url} returned no access token")]
    EmptyToken { url: String },
}

pub type DatastoreResult<T> = Result<T, DatastoreError>;
