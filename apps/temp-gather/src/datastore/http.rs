use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;

use super::client::Transport;
use super::query::{RunQueryRequest, RunQueryResponse};
use crate::auth::TokenSource;
use crate::error::{DatastoreError, DatastoreResult};

pub const DEFAULT_ENDPOINT: &str = "https://datastore.googleapis.com";

pub struct HttpTransport {
    http: HttpClient,
    base_url: String,
    tokens: Box<dyn TokenSource>,
}

impl HttpTransport {
    pub fn new(http: HttpClient, base_url: &str, tokens: Box<dyn TokenSource>) -> Self {
        Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn run_query_url(&self, project_id: &str) -> String {
        format!("{}/v1/projects/{}:runQuery", self.base_url, project_id)
    }
}

impl Transport for HttpTransport {
    fn run_query(
        &self,
        project_id: &str,
        request: &RunQueryRequest,
    ) -> DatastoreResult<RunQueryResponse> {
        let url = self.run_query_url(project_id);
        let mut builder = self.http.post(&url).json(request);
        if let Some(token) = self.tokens.token()? {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send()?;
        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &text));
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

fn api_error(status: u16, body: &str) -> DatastoreError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => DatastoreError::Api {
            status,
            code: envelope.error.status,
            message: envelope.error.message,
        },
        Err(_) => DatastoreError::Api {
            status,
            code: String::new(),
            message: body.trim().to_string(),
        },
    }
}
