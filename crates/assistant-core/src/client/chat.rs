use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{build_http, error_from_response, normalize_base_url};
use crate::dispatch::{Outcome, PreparedRequest, Reply};
use crate::error::BackendError;
use crate::state::{ChatRole, Source};

#[derive(Serialize)]
struct ChatTurn<'a> {
    role: ChatRole,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatTurn<'a>>,
    context_text: Option<&'a str>,
    session_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
    #[serde(default)]
    sources: Option<Vec<Source>>,
    session_id: Option<String>,
}

/// Client for the single session-based `/api/chat` endpoint.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ChatClient {
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

    pub async fn ask(&self, request: &PreparedRequest) -> Outcome {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequest {
            messages: request
                .history
                .iter()
                .map(|m| ChatTurn {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            context_text: request.selection.as_deref(),
            session_id: request.session_id.as_deref(),
        };
        tracing::debug!(
            %url,
            turns = body.messages.len(),
            session = ?body.session_id,
            "posting chat history"
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(e, self.timeout))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::from_reqwest(e, self.timeout))?;

        Ok(Reply {
            content: reply.response,
            sources: reply.sources.unwrap_or_default(),
            session_id: reply.session_id,
        })
    }
}
