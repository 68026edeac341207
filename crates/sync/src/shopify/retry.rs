//! Retrying transport for outbound Shopify calls.
//!
//! One backoff policy governs every call site. The legacy system this
//! replaces had slightly different base/multiplier/cap constants scattered
//! across callers; those were never intentional and are unified here.
//!
//! Retry classes:
//! - **429**: wait the larger of the `Retry-After` header and the computed
//!   backoff, up to the rate-limit cap.
//! - **5xx / network**: computed backoff with a shorter cap.
//! - **Other 4xx**: returned immediately - they indicate a caller error and
//!   retrying cannot succeed.

use rand::Rng;
use reqwest::StatusCode;
use tokio::time::Duration;
use tracing::warn;

use super::{RateLimiter, ShopifyError};

/// Maximum response body length retained in errors and logs.
const MAX_ERROR_BODY_LEN: usize = 512;

/// Which backoff ceiling applies to a retryable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// HTTP 429 from Shopify.
    RateLimit,
    /// HTTP 5xx from Shopify.
    ServerError,
    /// Transport-level failure (connect, timeout).
    Network,
}

/// Unified exponential-backoff-with-jitter policy.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// First retry delay before jitter.
    pub base: Duration,
    /// Growth factor per attempt.
    pub multiplier: f64,
    /// Ceiling for server/network retries.
    pub server_cap: Duration,
    /// Ceiling for rate-limit retries (Shopify buckets drain slowly).
    pub rate_limit_cap: Duration,
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Fraction of the delay randomized away (0.0 - 1.0).
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            multiplier: 2.0,
            server_cap: Duration::from_secs(10),
            rate_limit_cap: Duration::from_secs(60),
            max_attempts: 5,
            jitter: 0.25,
        }
    }
}

impl BackoffPolicy {
    /// Compute the delay before retrying `attempt` (0-based), with jitter.
    #[must_use]
    pub fn delay(&self, attempt: u32, class: RetryClass) -> Duration {
        let unit: f64 = rand::rng().random_range(0.0..1.0);
        self.delay_with_jitter_unit(attempt, class, unit)
    }

    /// Deterministic core of [`Self::delay`]: `unit` in `[0, 1)` selects the
    /// jitter point.
    #[must_use]
    pub fn delay_with_jitter_unit(&self, attempt: u32, class: RetryClass, unit: f64) -> Duration {
        let cap = match class {
            RetryClass::RateLimit => self.rate_limit_cap,
            RetryClass::ServerError | RetryClass::Network => self.server_cap,
        };
        let exp = self.base.as_secs_f64() * self.multiplier.powi(i32::try_from(attempt.min(16)).unwrap_or(16));
        let capped = exp.min(cap.as_secs_f64());
        // Subtractive jitter: delay in [(1 - jitter) * capped, capped].
        let jittered = capped * (1.0 - self.jitter * unit.clamp(0.0, 1.0));
        Duration::from_secs_f64(jittered)
    }
}

/// Send a request, retrying per the policy.
///
/// `build` constructs a fresh request for each attempt (request builders are
/// single-use). Every call waits for a rate-limiter token first, so retries
/// also respect the store quota.
///
/// # Errors
///
/// Returns the terminal `ShopifyError` once retries are exhausted, or
/// immediately for non-retryable responses.
pub(crate) async fn send_with_retry(
    limiter: &RateLimiter,
    policy: &BackoffPolicy,
    build: impl Fn() -> reqwest::RequestBuilder,
) -> Result<reqwest::Response, ShopifyError> {
    let mut attempt: u32 = 0;
    loop {
        limiter.acquire().await;

        let outcome = build().send().await;
        let last_attempt = attempt + 1 >= policy.max_attempts;

        match outcome {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }

                if status == StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = parse_retry_after(&response);
                    if last_attempt {
                        return Err(ShopifyError::RateLimited { retry_after_secs });
                    }
                    let computed = policy.delay(attempt, RetryClass::RateLimit);
                    let delay = retry_after_secs
                        .map_or(computed, |s| computed.max(Duration::from_secs(s)));
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Shopify rate limited (429), retrying"
                    );
                    tokio::time::sleep(delay).await;
                } else if status.is_server_error() {
                    let body = truncated_body(response).await;
                    if last_attempt {
                        return Err(ShopifyError::Server {
                            status: status.as_u16(),
                            body,
                        });
                    }
                    let delay = policy.delay(attempt, RetryClass::ServerError);
                    warn!(
                        attempt,
                        status = status.as_u16(),
                        delay_ms = delay.as_millis() as u64,
                        "Shopify server error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                } else if status == StatusCode::UNAUTHORIZED {
                    return Err(ShopifyError::Unauthorized(
                        "Invalid or expired access token".to_string(),
                    ));
                } else if status == StatusCode::NOT_FOUND {
                    return Err(ShopifyError::NotFound(truncated_body(response).await));
                } else {
                    // Remaining 4xx: caller error, retrying cannot succeed.
                    return Err(ShopifyError::Client {
                        status: status.as_u16(),
                        body: truncated_body(response).await,
                    });
                }
            }
            Err(e) => {
                if last_attempt {
                    return Err(ShopifyError::Http(e));
                }
                let delay = policy.delay(attempt, RetryClass::Network);
                warn!(
                    attempt,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "Network error calling Shopify, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }

        attempt += 1;
    }
}

/// Parse the `Retry-After` header as whole seconds.
fn parse_retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// Read a response body for error reporting, truncated to a sane length.
async fn truncated_body(response: reqwest::Response) -> String {
    let mut body = response.text().await.unwrap_or_default();
    body.truncate(MAX_ERROR_BODY_LEN);
    body
}
