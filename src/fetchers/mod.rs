//! Public market data fetchers for Polymarket and Kalshi.
//!
//! Both fetchers share one HTTP client shape: a sliding-window rate limiter
//! plus a bounded retry with exponential backoff. Exhausting the retries
//! aborts the run.

pub mod kalshi;
pub mod polymarket;

use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::{Client, StatusCode};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, warn};

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 100;

/// Rate limiter to respect API limits
struct RateLimiter {
    requests_per_10s: u32,
    current_requests: u32,
    window_start: std::time::Instant,
}

impl RateLimiter {
    fn new(requests_per_10s: u32) -> Self {
        Self {
            requests_per_10s,
            current_requests: 0,
            window_start: std::time::Instant::now(),
        }
    }

    async fn acquire(&mut self) {
        let elapsed = self.window_start.elapsed();

        // Reset window if 10 seconds have passed
        if elapsed >= Duration::from_secs(10) {
            self.current_requests = 0;
            self.window_start = std::time::Instant::now();
        }

        // If we've hit the limit, wait for the window to reset
        if self.current_requests >= self.requests_per_10s {
            let wait_time = Duration::from_secs(10).saturating_sub(elapsed);
            if wait_time > Duration::ZERO {
                debug!("Rate limiting: waiting {}ms", wait_time.as_millis());
                sleep(wait_time).await;
                self.current_requests = 0;
                self.window_start = std::time::Instant::now();
            }
        }

        self.current_requests += 1;
    }
}

/// Rate-limited HTTP client shared by both platform fetchers.
pub struct ApiClient {
    client: Client,
    limiter: RateLimiter,
}

impl ApiClient {
    pub fn new(requests_per_10s: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("arb-scout/0.1 (market scout)")
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            client,
            limiter: RateLimiter::new(requests_per_10s),
        })
    }

    /// GET a URL with query parameters and exponential backoff retry.
    pub async fn get_with_retry(
        &mut self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<reqwest::Response> {
        self.limiter.acquire().await;

        let mut backoff = INITIAL_BACKOFF_MS;

        for attempt in 0..MAX_RETRIES {
            let request = self.client.get(url).query(params);

            match timeout(Duration::from_secs(10), request.send()).await {
                Ok(Ok(response)) => {
                    if response.status().is_success() {
                        return Ok(response);
                    } else if response.status() == StatusCode::TOO_MANY_REQUESTS {
                        warn!("Rate limited on attempt {}, backing off", attempt + 1);
                        sleep(Duration::from_millis(backoff * 10)).await;
                    } else {
                        let status = response.status();
                        let text = response.text().await.unwrap_or_default();
                        error!("API error {}: {}", status, text);
                        bail!("API error {}: {}", status, text);
                    }
                }
                Ok(Err(e)) => {
                    warn!("Request failed (attempt {}): {}", attempt + 1, e);
                }
                Err(_) => {
                    warn!("Request timeout (attempt {})", attempt + 1);
                }
            }

            if attempt < MAX_RETRIES - 1 {
                debug!("Retrying in {}ms", backoff);
                sleep(Duration::from_millis(backoff)).await;
                backoff = (backoff * 2).min(30000);
            }
        }

        bail!("Max retries exceeded for {}", url)
    }
}
