use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};

use super::credentials::{AuthorizedUser, ServiceAccountKey};
use crate::error::AuthError;
use crate::net::http_base_url;

pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

pub(crate) fn assertion_claims(key: &ServiceAccountKey, now: DateTime<Utc>) -> AssertionClaims {
    let iat = now.timestamp();
    AssertionClaims {
        iss: key.client_email.clone(),
        scope: DATASTORE_SCOPE.to_string(),
        aud: key.token_uri().to_string(),
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    }
}

pub(crate) fn sign_assertion(
    key: &ServiceAccountKey,
    now: DateTime<Utc>,
) -> Result<String, AuthError> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
    Ok(encode(&header, &assertion_claims(key, now), &encoding_key)?)
}

pub fn service_account_token(
    http: &HttpClient,
    key: &ServiceAccountKey,
) -> Result<AccessToken, AuthError> {
    let now = Utc::now();
    let assertion = sign_assertion(key, now)?;
    let url = key.token_uri();
    let response = http
        .post(url)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .map_err(|source| AuthError::Request {
            url: url.to_string(),
            source,
        })?;
    read_token_response(url, response, now)
}

pub fn refresh_token(http: &HttpClient, user: &AuthorizedUser) -> Result<AccessToken, AuthError> {
    let now = Utc::now();
    let url = user.token_uri();
    let response = http
        .post(url)
        .form(&[
            ("grant_type", "refresh_token"),
            ("client_id", user.client_id.as_str()),
            ("client_secret", user.client_secret.as_str()),
            ("refresh_token", user.refresh_token.as_str()),
        ])
        .send()
        .map_err(|source| AuthError::Request {
            url: url.to_string(),
            source,
        })?;
    read_token_response(url, response, now)
}

pub fn metadata_token_url(host: &str) -> String {
    format!(
        "{}/computeMetadata/v1/instance/service-accounts/default/token",
        http_base_url(host)
    )
}

pub fn metadata_project_url(host: &str) -> String {
    format!("{}/computeMetadata/v1/project/project-id", http_base_url(host))
}

pub fn metadata_token(http: &HttpClient, host: &str) -> Result<AccessToken, AuthError> {
    let now = Utc::now();
    let url = metadata_token_url(host);
    let response = http
        .get(&url)
        .header("Metadata-Flavor", "Google")
        .send()
        .map_err(|source| AuthError::Request {
            url: url.clone(),
            source,
        })?;
    read_token_response(&url, response, now)
}

pub fn metadata_project_id(http: &HttpClient, host: &str) -> Result<String, AuthError> {
    let url = metadata_project_url(host);
    let response = http
        .get(&url)
        .header("Metadata-Flavor", "Google")
        .send()
        .map_err(|source| AuthError::Request {
            url: url.clone(),
            source,
        })?;
    let status = response.status();
    let body = response.text().unwrap_or_default();
    if !status.is_success() {
        return Err(AuthError::Endpoint {
            url,
            status: status.as_u16(),
            body,
        });
    }
    let project = body.trim();
    if project.is_empty() {
        return Err(AuthError::Endpoint {
            url,
            status: status.as_u16(),
            body: "empty project id".to_string(),
        });
    }
    Ok(project.to_string())
}

fn read_token_response(
    url: &str,
    response: reqwest::blocking::Response,
    requested_at: DateTime<Utc>,
) -> Result<AccessToken, AuthError> {
    let status = response.status();
    let body = response.text().unwrap_or_default();
    if !status.is_success() {
        return Err(AuthError::Endpoint {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    parse_token_body(url, &body, requested_at)
}

pub(crate) fn parse_token_body(
    url: &str,
    body: &str,
    requested_at: DateTime<Utc>,
) -> Result<AccessToken, AuthError> {
    let parsed: TokenResponse = serde_json::from_str(body).map_err(|_| AuthError::Endpoint {
        url: url.to_string(),
        status: 200,
        body: body.chars().take(200).collect(),
    })?;
    let value = parsed.access_token.trim().to_string();
    if value.is_empty() {
        return Err(AuthError::EmptyToken {
            url: url.to_string(),
        });
    }
    let expires_in = parsed
        .expires_in
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    Ok(AccessToken {
        value,
        expires_at: requested_at + ChronoDuration::seconds(expires_in),
    })
}
