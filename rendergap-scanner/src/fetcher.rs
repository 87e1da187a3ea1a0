//! Rate-limited HTTP fetching.
//!
//! Every request goes through a shared [`RateLimit`], waits a random jitter
//! and is retried with exponential backoff on transient failures.

use crate::error::{Result, ScanError};
use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Budget shared by every request the process makes.
#[async_trait]
pub trait RateLimit: Send + Sync {
    /// Wait until one more request fits in the budget, then claim it.
    async fn acquire(&self);
}

/// Allows at most `max_requests` inside any rolling `window`.
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    sent: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            sent: Mutex::new(VecDeque::new()),
        }
    }

    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }
}

#[async_trait]
impl RateLimit for SlidingWindowLimiter {
    async fn acquire(&self) {
        loop {
            let wait = {
                let mut sent = self.sent.lock().await;
                let now = Instant::now();
                while let Some(oldest) = sent.front() {
                    if now.duration_since(*oldest) >= self.window {
                        sent.pop_front();
                    } else {
                        break;
                    }
                }

                if sent.len() < self.max_requests {
                    sent.push_back(now);
                    return;
                }

                // Full window: sleep until the oldest slot expires
                match sent.front() {
                    Some(oldest) => self.window.saturating_sub(now.duration_since(*oldest)),
                    None => Duration::ZERO,
                }
            };

            debug!("Rate limit reached, waiting {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }
}

/// Never waits. Used in tests and for one-off fetches.
pub struct NoopLimiter;

#[async_trait]
impl RateLimit for NoopLimiter {
    async fn acquire(&self) {}
}

/// Knobs for [`Fetcher`].
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    /// Upper bound of the random pause taken before every attempt.
    pub jitter_max: Duration,
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub backoff_base: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            jitter_max: Duration::from_millis(1500),
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            user_agent: format!(
                "Mozilla/5.0 (compatible; rendergap/{}; +https://github.com/trapdoorsec/rendergap)",
                env!("CARGO_PKG_VERSION")
            ),
        }
    }
}

impl FetchConfig {
    pub fn with_jitter(mut self, jitter_max: Duration) -> Self {
        self.jitter_max = jitter_max;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, backoff_base: Duration) -> Self {
        self.max_retries = max_retries;
        self.backoff_base = backoff_base;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    limiter: Arc<dyn RateLimit>,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(limiter: Arc<dyn RateLimit>) -> Result<Self> {
        Self::with_config(limiter, FetchConfig::default())
    }

    pub fn with_config(limiter: Arc<dyn RateLimit>, config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .connect_timeout(config.timeout / 2)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            limiter,
            config,
        })
    }

    /// GET `url`, retrying timeouts, connection failures, 5xx and 429.
    ///
    /// Non-retryable statuses fail straight away with [`ScanError::Status`];
    /// once the retry budget is spent the last error is returned.
    pub async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        let mut attempt: u32 = 0;

        loop {
            self.limiter.acquire().await;

            let jitter = self.jitter();
            if !jitter.is_zero() {
                tokio::time::sleep(jitter).await;
            }

            debug!("Fetching {} (attempt {})", url, attempt + 1);
            match self.attempt(url).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.backoff(attempt);
                    warn!(
                        "Fetch of {} failed ({}), retry {}/{} in {:?}",
                        url, e, attempt, self.config.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt(&self, url: &str) -> Result<FetchResponse> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response.text().await?;

        Ok(FetchResponse {
            url: url.to_string(),
            final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.config.jitter_max.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.config.backoff_base.saturating_mul(factor)
    }
}
