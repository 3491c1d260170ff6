//! Generic HTTP judge adapter.
//!
//! POSTs `{"content": "..."}` to a backend URL and expects a JSON body with
//! `risk_score`, `confidence`, and an optional `cost`.

use super::{Judge, JudgeError, Judgment};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Judge reached over a plain JSON-over-HTTP contract.
pub struct HttpJudge {
    /// Backend ID, used in log fields only
    id: String,
    /// Full evaluation endpoint URL
    url: String,
    /// Shared HTTP client for connection pooling
    client: Client,
    /// Bearer token, if the backend requires one
    api_key: Option<String>,
}

impl HttpJudge {
    pub fn new(id: impl Into<String>, url: impl Into<String>, client: Client) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            client,
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Serialize)]
struct JudgeRequestBody<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct JudgeResponseBody {
    risk_score: f64,
    confidence: f64,
    #[serde(default)]
    cost: Option<f64>,
}

#[async_trait]
impl Judge for HttpJudge {
    async fn judge(&self, content: &str, timeout: Duration) -> Result<Judgment, JudgeError> {
        let mut request = self
            .client
            .post(&self.url)
            .timeout(timeout)
            .json(&JudgeRequestBody { content });

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                JudgeError::Timeout(timeout.as_millis() as u64)
            } else {
                JudgeError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::debug!(
                backend_id = %self.id,
                status = status.as_u16(),
                "Judge returned error status"
            );
            return Err(JudgeError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body: JudgeResponseBody = response.json().await.map_err(|e| {
            if e.is_timeout() {
                JudgeError::Timeout(timeout.as_millis() as u64)
            } else {
                JudgeError::InvalidResponse(e.to_string())
            }
        })?;

        Ok(Judgment {
            risk_score: body.risk_score,
            confidence: body.confidence,
            cost: body.cost,
        })
    }
}
