pub mod ask;
pub mod chat;

pub use ask::AskClient;
pub use chat::ChatClient;

use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, Response};
use serde::Deserialize;

use crate::backend::Backend;
use crate::config::Config;
use crate::dispatch::{Outcome, PreparedRequest};
use crate::error::BackendError;

/// The configured backend, behind one dispatch point.
#[derive(Clone)]
pub enum BackendClient {
    Ask(AskClient),
    Chat(ChatClient),
}

impl BackendClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = config.request_timeout();
        Ok(match config.backend {
            Backend::Ask => BackendClient::Ask(AskClient::new(&config.base_url, timeout)?),
            Backend::Chat => BackendClient::Chat(ChatClient::new(&config.base_url, timeout)?),
        })
    }

    pub fn backend(&self) -> Backend {
        match self {
            BackendClient::Ask(_) => Backend::Ask,
            BackendClient::Chat(_) => Backend::Chat,
        }
    }

    pub fn base_url(&self) -> &str {
        match self {
            BackendClient::Ask(client) => client.base_url(),
            BackendClient::Chat(client) => client.base_url(),
        }
    }

    pub async fn ask(&self, request: &PreparedRequest) -> Outcome {
        match self {
            BackendClient::Ask(client) => client.ask(request).await,
            BackendClient::Chat(client) => client.ask(request).await,
        }
    }

    /// `GET {base}/health`, returning the parsed body.
    pub async fn health(&self) -> std::result::Result<serde_json::Value, BackendError> {
        let (http, timeout) = match self {
            BackendClient::Ask(client) => (client.http(), client.timeout()),
            BackendClient::Chat(client) => (client.http(), client.timeout()),
        };
        let url = format!("{}/health", self.base_url());

        let response = http
            .get(&url)
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(e, timeout))?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| BackendError::from_reqwest(e, timeout))
    }
}

pub(crate) fn build_http(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

pub(crate) fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
    error: Option<serde_json::Value>,
}

fn field_text(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        // FastAPI validation errors put a list of objects under `detail`
        other => Some(other.to_string()),
    }
}

/// Build the error for a non-success response from its `detail`/`error` field.
pub(crate) async fn error_from_response(response: Response) -> BackendError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
    let detail = field_text(parsed.detail).or_else(|| field_text(parsed.error));

    tracing::warn!(status, detail = ?detail, "backend returned an error status");
    BackendError::status(status, detail)
}
