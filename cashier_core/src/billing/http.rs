//! HTTP request execution with bounded retries
//!
//! Sends a prepared request, maps transport failures and error statuses onto
//! [`ProviderError`], and retries only the failures that are transient.

use reqwest::RequestBuilder;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::ProviderError;

/// Longest `Retry-After` we are willing to honour
const MAX_RETRY_AFTER_SECS: u64 = 30;
/// Response bodies longer than this are truncated in logs
const LOG_BODY_LIMIT: usize = 512;

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    code: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// HTTP helpers shared by provider clients
pub struct HttpUtils;

impl HttpUtils {
    /// Send a request and return the body of a successful response
    pub async fn execute_request(
        request_builder: RequestBuilder,
        operation: &str,
    ) -> Result<String, ProviderError> {
        log::debug!("[billing] {operation}");

        let response = request_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::timeout(e.to_string())
            } else {
                ProviderError::network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        log::debug!("[billing] {operation} -> HTTP {status}");

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("Failed to read response body: {e}")))?;

        if status == 429 {
            log::warn!("[billing] {operation} rate limited, retry_after={retry_after:?}");
            return Err(ProviderError::RateLimited { retry_after });
        }

        if !(200..300).contains(&status) {
            let error = api_error(status, &body);
            if status >= 500 {
                log::warn!("[billing] {operation} server error: {error}");
            } else {
                log::debug!("[billing] {operation} rejected: {error}");
            }
            return Err(error);
        }

        log::debug!("[billing] {operation} body: {}", truncate_for_log(&body));
        Ok(body)
    }

    /// Send a request, retrying transient failures up to `max_retries` times
    ///
    /// Delays grow exponentially from 100ms and are capped at 10s; a
    /// rate-limit response with `Retry-After` uses that delay instead.
    pub async fn execute_request_with_retry(
        request_builder: RequestBuilder,
        operation: &str,
        max_retries: u32,
    ) -> Result<String, ProviderError> {
        if max_retries == 0 {
            return Self::execute_request(request_builder, operation).await;
        }

        let mut last_error = None;

        for attempt in 0..=max_retries {
            let Some(request) = request_builder.try_clone() else {
                log::warn!("[billing] {operation}: request body cannot be cloned, retry disabled");
                return Self::execute_request(request_builder, operation).await;
            };

            match Self::execute_request(request, operation).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < max_retries && is_retryable(&e) => {
                    let delay = retry_delay(&e, attempt);
                    log::warn!(
                        "[billing] {} failed (attempt {}/{}), retrying in {:.1}s: {}",
                        operation,
                        attempt + 1,
                        max_retries + 1,
                        delay.as_secs_f32(),
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| ProviderError::network("All retries exhausted with no error captured")))
    }

    /// Parse a JSON response body
    pub fn parse_json<T>(body: &str, operation: &str) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str(body).map_err(|e| {
            log::error!("[billing] {operation}: JSON parse failed: {e}");
            log::error!("[billing] Raw response: {}", truncate_for_log(body));
            ProviderError::parse(e.to_string())
        })
    }
}

/// Build an API error from an error response, using the provider's message when present
fn api_error(status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => ProviderError::Api {
            status,
            code: envelope.error.code.or(envelope.error.kind),
            message: envelope
                .error
                .message
                .unwrap_or_else(|| format!("HTTP {status}")),
        },
        Err(_) => ProviderError::Api {
            status,
            code: None,
            message: if body.trim().is_empty() {
                format!("HTTP {status}")
            } else {
                truncate_for_log(body)
            },
        },
    }
}

fn is_retryable(error: &ProviderError) -> bool {
    error.is_transient()
}

fn retry_delay(error: &ProviderError, attempt: u32) -> Duration {
    if let ProviderError::RateLimited {
        retry_after: Some(secs),
    } = error
    {
        Duration::from_secs((*secs).min(MAX_RETRY_AFTER_SECS))
    } else {
        backoff_delay(attempt)
    }
}

/// 100ms, 200ms, 400ms, ... capped at 10 seconds
fn backoff_delay(attempt: u32) -> Duration {
    let capped_attempt = attempt.min(20);
    let delay_ms = 100_u64.saturating_mul(1_u64 << capped_attempt);
    Duration::from_millis(delay_ms.min(10_000))
}

fn truncate_for_log(text: &str) -> String {
    if text.len() <= LOG_BODY_LIMIT {
        return text.to_string();
    }
    let mut end = LOG_BODY_LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes)", &text[..end], text.len())
}
