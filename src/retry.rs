//! Exponential-backoff retry for JSON API calls.
//!
//! Every network operation in the crate funnels through
//! [`RetryPolicy::fetch_json`], so the transient-failure handling lives
//! in exactly one place.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::{Error, Result};

/// Attempts made before a transient failure is escalated.
pub(crate) const MAX_ATTEMPTS: u32 = 6;

/// Backoff base: the wait after failed attempt `n` is `base * 2^n`.
pub(crate) const BASE_DELAY: Duration = Duration::from_millis(300);

/// Retry policy applied to every request.
///
/// 5xx responses and transport errors are transient: the policy backs
/// off and retries up to [`MAX_ATTEMPTS`] times. Any other non-accepted
/// status fails on the first attempt with no delay.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub(crate) fn with_base_delay(base_delay: Duration) -> Self {
        Self { base_delay }
    }

    /// Wait applied after failed attempt `attempt` (zero-indexed).
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.pow(attempt)
    }

    /// Perform an HTTP request and decode its JSON body, retrying
    /// transient failures.
    ///
    /// `build` produces a fresh request for each attempt; `accept`
    /// decides which status counts as success. `label` names the
    /// operation in errors and logs.
    pub(crate) async fn fetch_json<T, B, P>(
        &self,
        label: &'static str,
        accept: P,
        build: B,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Fn() -> reqwest::RequestBuilder,
        P: Fn(StatusCode) -> bool,
    {
        let mut attempt = 0;
        loop {
            let outcome = async {
                let response = build().send().await?;
                let status = response.status();
                if accept(status) {
                    return Ok(response.json::<T>().await?);
                }

                let body = response.text().await.unwrap_or_default();
                let body = if body.is_empty() {
                    "<empty>".to_string()
                } else {
                    body
                };
                Err(Error::Status {
                    label,
                    status,
                    body,
                })
            }
            .await;

            let err = match outcome {
                Ok(json) => return Ok(json),
                Err(err) if err.is_transient() => err,
                Err(err) => return Err(err),
            };

            let wait = self.delay(attempt);
            tracing::debug!(
                "{label}: attempt {} of {MAX_ATTEMPTS} failed ({err}), backing off {wait:?}",
                attempt + 1
            );
            tokio::time::sleep(wait).await;

            attempt += 1;
            if attempt == MAX_ATTEMPTS {
                return Err(Error::RetriesExhausted {
                    label,
                    attempts: MAX_ATTEMPTS,
                    source: Box::new(err),
                });
            }
        }
    }
}
