//! Rate-Limited HTTP Client for the model API
//!
//! Wraps a reqwest client with a per-minute quota. Requests are sent exactly
//! once; generation calls are never retried automatically.

use governor::{Quota, RateLimiter, state::NotKeyed, clock::DefaultClock, middleware::NoOpMiddleware};
use reqwest::{Client, RequestBuilder, Response};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::providers::traits::ProviderError;

type DirectLimiter = RateLimiter<NotKeyed, governor::state::InMemoryState, DefaultClock, NoOpMiddleware>;

/// Rate-limited HTTP client for API requests
///
/// Clones share the same limiter.
#[derive(Clone)]
pub struct RateLimitedClient {
    /// Inner HTTP client
    client: Client,

    /// Rate limiter (requests per minute)
    limiter: Arc<DirectLimiter>,

    /// Configured rate limit
    rate_limit_per_minute: u32,
}

impl RateLimitedClient {
    /// Create a new rate-limited client
    ///
    /// # Arguments
    /// * `rate_limit_per_minute` - Maximum requests allowed per minute
    /// * `timeout` - Whole-request timeout; image generation is slow
    pub fn new(rate_limit_per_minute: u32, timeout: Duration) -> Result<Self, ProviderError> {
        let rate = NonZeroU32::new(rate_limit_per_minute.max(1)).unwrap_or(NonZeroU32::MIN);
        let limiter = RateLimiter::direct(Quota::per_minute(rate));

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("r-image-styler/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(RateLimitedClient {
            client,
            limiter: Arc::new(limiter),
            rate_limit_per_minute,
        })
    }

    pub fn rate_limit_per_minute(&self) -> u32 {
        self.rate_limit_per_minute
    }

    /// Build a POST request
    pub fn post(&self, url: &str) -> RateLimitedRequestBuilder {
        RateLimitedRequestBuilder {
            client: self,
            builder: self.client.post(url),
        }
    }

    /// Wait for rate limit and execute request
    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ProviderError> {
        self.limiter.until_ready().await;

        debug!("Executing rate-limited request");

        let response = builder.send().await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);

            warn!(retry_after_secs = retry_after, "Rate limited by provider");

            return Err(ProviderError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        Ok(response)
    }
}

/// Request builder wrapper that enforces rate limiting
pub struct RateLimitedRequestBuilder<'a> {
    client: &'a RateLimitedClient,
    builder: RequestBuilder,
}

impl<'a> RateLimitedRequestBuilder<'a> {
    /// Add a header to the request
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.builder = self.builder.header(key, value);
        self
    }

    /// Add JSON body to the request
    pub fn json<T: serde::Serialize + ?Sized>(mut self, json: &T) -> Self {
        self.builder = self.builder.json(json);
        self
    }

    /// Send the request (waits for rate limit)
    pub async fn send(self) -> Result<Response, ProviderError> {
        self.client.execute(self.builder).await
    }
}
