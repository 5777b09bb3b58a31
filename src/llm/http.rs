//! Shared HTTP plumbing for vendor clients.
//!
//! Every vendor call goes through [`HttpSender::post_json`]: per-request
//! timeout, bounded retry with exponential backoff on 429/500/502/504 and
//! connection failures, and uniform mapping of status codes to
//! [`ProviderError`]. A 503 is never retried; it means the model is
//! loading and the caller should wait and call again.

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::ProviderError;

/// Base delay for exponential backoff (ms).
const BASE_BACKOFF_MS: u64 = 1000;
const MAX_BACKOFF_MS: u64 = 30_000;

pub const MODEL_LOADING_MESSAGE: &str = "Model is loading, please try again in 10-20 seconds";

pub struct HttpSender {
    http: Client,
    provider: &'static str,
    max_retries: u32,
}

impl HttpSender {
    pub fn new(provider: &'static str, timeout: Duration, max_retries: u32) -> reqwest::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            provider,
            max_retries,
        })
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    /// POST a JSON body and return the parsed JSON reply.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &B,
    ) -> Result<Value, ProviderError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = backoff_ms(attempt);
                debug!(provider = self.provider, attempt, delay_ms = delay, "Retrying vendor call");
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            let mut req = self.http.post(url).json(body);
            for (name, value) in headers {
                req = req.header(*name, value);
            }

            let started = Instant::now();
            let response = match req.send().await {
                Ok(r) => r,
                Err(e) if e.is_timeout() => {
                    warn!(provider = self.provider, "Vendor call timed out");
                    return Err(ProviderError::Timeout(self.provider.to_string()));
                }
                Err(e) => {
                    warn!(provider = self.provider, attempt, error = %e, "Vendor request failed");
                    last_error = Some(ProviderError::Transport {
                        provider: self.provider.to_string(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            let status = response.status();
            debug!(
                provider = self.provider,
                status = status.as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Vendor responded"
            );

            if status.is_success() {
                let text = response.text().await.map_err(|e| self.transport(e))?;
                return serde_json::from_str(&text).map_err(|e| ProviderError::MalformedResponse {
                    provider: self.provider.to_string(),
                    detail: format!("invalid JSON body: {e}"),
                });
            }

            let error_text = response.text().await.unwrap_or_default();

            match status {
                StatusCode::SERVICE_UNAVAILABLE => {
                    return Err(ProviderError::ModelLoading(MODEL_LOADING_MESSAGE.to_string()));
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    return Err(ProviderError::Unauthorized(self.provider.to_string()));
                }
                StatusCode::TOO_MANY_REQUESTS
                | StatusCode::INTERNAL_SERVER_ERROR
                | StatusCode::BAD_GATEWAY
                | StatusCode::GATEWAY_TIMEOUT => {
                    warn!(provider = self.provider, status = %status, attempt, "Retryable vendor error");
                    last_error = Some(self.api_error(status, error_text));
                    continue;
                }
                _ => return Err(self.api_error(status, error_text)),
            }
        }

        Err(last_error.unwrap_or_else(|| ProviderError::Transport {
            provider: self.provider.to_string(),
            message: "no attempt made".to_string(),
        }))
    }

    fn api_error(&self, status: StatusCode, body: String) -> ProviderError {
        ProviderError::Api {
            provider: self.provider.to_string(),
            status: status.as_u16(),
            body: truncate(&body, 500),
        }
    }

    fn transport(&self, e: reqwest::Error) -> ProviderError {
        ProviderError::Transport {
            provider: self.provider.to_string(),
            message: e.to_string(),
        }
    }

    pub fn malformed(&self, detail: &str) -> ProviderError {
        ProviderError::MalformedResponse {
            provider: self.provider.to_string(),
            detail: detail.to_string(),
        }
    }
}

/// Exponential delay before retry `attempt` (1-based), capped.
fn backoff_ms(attempt: u32) -> u64 {
    BASE_BACKOFF_MS
        .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
        .min(MAX_BACKOFF_MS)
}

/// Cut `s` to at most `max` characters.
fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Follow a path of object keys and array indices into `value` and
/// return the string found there.
pub fn text_at(value: &Value, path: &[PathSeg]) -> Option<String> {
    let mut cur = value;
    for seg in path {
        cur = match seg {
            PathSeg::Key(k) => cur.get(*k)?,
            PathSeg::Index(i) => cur.get(*i)?,
        };
    }
    cur.as_str().map(str::to_string)
}

#[derive(Debug, Clone, Copy)]
pub enum PathSeg {
    Key(&'static str),
    Index(usize),
}
