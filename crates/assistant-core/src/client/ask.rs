use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{build_http, error_from_response, normalize_base_url};
use crate::dispatch::{Outcome, PreparedRequest, Reply};
use crate::error::BackendError;
use crate::state::Source;

#[derive(Serialize)]
struct AskRequest<'a> {
    question: &'a str,
}

#[derive(Serialize)]
struct AskSelectionRequest<'a> {
    question: &'a str,
    selection: &'a str,
}

#[derive(Deserialize)]
struct AskResponse {
    answer: Option<String>,
    response: Option<String>,
    message: Option<String>,
    #[serde(default)]
    sources: Option<Vec<Source>>,
}

/// Client for the two-endpoint, selection-aware backend.
#[derive(Clone)]
pub struct AskClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl AskClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_http(timeout)?,
            base_url: normalize_base_url(base_url),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `/api/ask-selection` when the request carries selection context,
    /// `/api/ask` otherwise.
    pub async fn ask(&self, request: &PreparedRequest) -> Outcome {
        let builder = match request.selection.as_deref() {
            Some(selection) => {
                let url = format!("{}/api/ask-selection", self.base_url);
                tracing::debug!(%url, "asking with selection context");
                self.client.post(url).json(&AskSelectionRequest {
                    question: &request.question,
                    selection,
                })
            }
            None => {
                let url = format!("{}/api/ask", self.base_url);
                tracing::debug!(%url, "asking");
                self.client.post(url).json(&AskRequest {
                    question: &request.question,
                })
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(e, self.timeout))?;
        tracing::debug!(status = response.status().as_u16(), "backend responded");

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: AskResponse = response
            .json()
            .await
            .map_err(|e| BackendError::from_reqwest(e, self.timeout))?;
        let content = body
            .answer
            .or(body.response)
            .or(body.message)
            .ok_or_else(|| BackendError::Decode("response contained no answer".to_string()))?;

        Ok(Reply {
            content,
            sources: body.sources.unwrap_or_default(),
            session_id: None,
        })
    }
}
