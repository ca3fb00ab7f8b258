//! Async client for the Keyward dashboard API.
//!
//! Every request carries the caller's bearer token. Transient failures
//! (429 and 5xx, timeouts, connection errors) are retried with exponential
//! backoff and jitter. [`ProjectStore`] adds an explicitly owned project
//! list cache with a staleness window on top.
//!
//! # Example
//!
//! ```rust,no_run
//! use keyward_client::Keyward;
//!
//! # async fn example() -> Result<(), keyward_client::KeywardError> {
//! let client = Keyward::new(std::env::var("KEYWARD_TOKEN").unwrap_or_default())?;
//! for project in client.list_projects().await? {
//!     println!("{} {}", project.id, project.name);
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod store;

pub use error::KeywardError;
pub use store::ProjectStore;

use std::fmt;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.keyward.dev";
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Configuration for the Keyward client.
///
/// Zero durations and a zero retry count fall back to the defaults.
#[derive(Clone)]
pub struct KeywardConfig {
    /// Bearer token issued by the auth provider.
    pub token: String,
    /// API base URL. Empty falls back to `KEYWARD_API_URL`, then
    /// `https://api.keyward.dev`.
    pub base_url: String,
    /// Request timeout. Default: 10 seconds.
    pub timeout: Duration,
    /// Max retry attempts. Default: 3.
    pub max_retries: u32,
    /// First backoff delay, doubled per attempt. Default: 500 ms.
    pub retry_base_delay: Duration,
    /// Staleness window of [`ProjectStore`]. Default: 5 minutes.
    pub cache_ttl: Duration,
}

impl Default for KeywardConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            base_url: String::new(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl fmt::Debug for KeywardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeywardConfig")
            .field("token", &"[redacted]")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

/// Keyward API client. Cheap to clone.
#[derive(Clone)]
pub struct Keyward {
    token: String,
    base_url: String,
    max_retries: u32,
    retry_base_delay: Duration,
    cache_ttl: Duration,
    client: reqwest::Client,
}

impl fmt::Debug for Keyward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyward")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
