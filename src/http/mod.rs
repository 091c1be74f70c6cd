//! A thin, retry-free HTTP layer shared by the spot and perp surfaces.
//!
//! One `reqwest::Client` is built per `AsterClient` and cloned cheaply into
//! every API struct (the underlying connection pool is reference-counted
//! internally, same as the teacher's long-lived provider handles). Callers
//! pick signed vs. unsigned at the call site; this module only knows how
//! to attach a header, send, and classify the response.

use crate::error::CoreError;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    pub async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
        api_key: Option<&str>,
        suppress_errors: bool,
    ) -> Result<Value, CoreError> {
        debug!(url, signed = api_key.is_some(), "GET");
        let mut request = self.client.get(url).query(params);
        if let Some(key) = api_key {
            request = request.header("X-MBX-APIKEY", key);
        }
        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| CoreError::Transport {
                status: 0,
                body: "request timed out".to_string(),
            })?
            .map_err(|e| CoreError::Transport {
                status: 0,
                body: e.to_string(),
            })?;
        self.handle_response(response, suppress_errors).await
    }

    /// POST with the signed/unsigned params placed in the query string (the
    /// venue accepts this for writes too, and it keeps signing uniform
    /// across GET and POST).
    pub async fn post(
        &self,
        url: &str,
        params: &[(String, String)],
        api_key: Option<&str>,
        suppress_errors: bool,
    ) -> Result<Value, CoreError> {
        debug!(url, signed = api_key.is_some(), "POST");
        let mut request = self.client.post(url).query(params);
        if let Some(key) = api_key {
            request = request.header("X-MBX-APIKEY", key);
        }
        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| CoreError::Transport {
                status: 0,
                body: "request timed out".to_string(),
            })?
            .map_err(|e| CoreError::Transport {
                status: 0,
                body: e.to_string(),
            })?;
        self.handle_response(response, suppress_errors).await
    }

    async fn handle_response(&self, response: reqwest::Response, suppress_errors: bool) -> Result<Value, CoreError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| CoreError::Transport {
            status: status.as_u16(),
            body: e.to_string(),
        })?;

        if !status.is_success() {
            if suppress_errors {
                debug!(status = status.as_u16(), body = %truncate_for_log(&body), "suppressed non-2xx response");
            } else {
                warn!(status = status.as_u16(), body = %truncate_for_log(&body), "non-2xx response");
            }
            return Err(CoreError::Transport {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value = serde_json::from_str(&body).map_err(|e| CoreError::Transport {
            status: status.as_u16(),
            body: format!("invalid JSON body: {e}"),
        })?;

        if let Some(code) = json.get("code").and_then(Value::as_i64) {
            if code < 0 {
                let message = json
                    .get("msg")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown venue error")
                    .to_string();
                return Err(CoreError::Venue { code, message });
            }
        }

        Ok(json)
    }
}

fn truncate_for_log(body: &str) -> String {
    const MAX: usize = 500;
    if body.len() > MAX {
        format!("{}...", &body[..MAX])
    } else {
        body.to_string()
    }
}
