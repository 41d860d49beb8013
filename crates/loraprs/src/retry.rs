//! Retry policies for the blocking recovery paths.
//!
//! Radio bring-up and wireless re-association may have to wait for the
//! hardware or the network. [`RetryPolicy`] re-runs a single attempt with a
//! fixed backoff until it succeeds or the attempt budget is spent.

use std::future::Future;
use std::time::Duration;

use loraprs_core::error::Result;
use loraprs_core::uplink::Uplink;

/// Backoff used for radio bring-up and uplink reconnects.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

/// Fixed-backoff retry, bounded or unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Retry until success.
    pub fn unbounded(backoff: Duration) -> Self {
        Self {
            max_attempts: None,
            backoff,
        }
    }

    /// Give up after `attempts` tries (at least one is always made).
    pub fn bounded(attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: Some(attempts.max(1)),
            backoff,
        }
    }

    fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max)
    }

    /// Run `op` until it succeeds, returning the last error if the policy
    /// gives up.
    ///
    /// # Example
    ///
    /// ```
    /// use loraprs::retry::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// # async fn example() -> loraprs_core::Result<()> {
    /// let policy = RetryPolicy::bounded(3, Duration::from_millis(10));
    /// let addr = policy
    ///     .retry("resolve relay", || async {
    ///         Ok::<_, loraprs_core::Error>("127.0.0.1:14580".to_string())
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn retry<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(what, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if self.exhausted(attempt) => {
                    tracing::error!(what, attempt, error = %e, "Giving up");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        what,
                        attempt,
                        error = %e,
                        backoff_ms = self.backoff.as_millis(),
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(self.backoff).await;
                }
            }
        }
    }

    /// Reconnect `uplink` under this policy.
    ///
    /// Stops as soon as the uplink reports up, even if the last attempt
    /// returned an error.
    pub async fn reconnect_uplink(&self, uplink: &mut dyn Uplink) -> Result<()> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let result = uplink.reconnect().await;
            if uplink.is_up() {
                tracing::info!(attempt, "Uplink reconnected");
                return Ok(());
            }
            match result {
                Err(e) if self.exhausted(attempt) => {
                    tracing::error!(attempt, error = %e, "Uplink reconnect abandoned");
                    return Err(e);
                }
                Ok(()) if self.exhausted(attempt) => {
                    return Err(loraprs_core::Error::UplinkDown);
                }
                _ => {
                    tracing::debug!(attempt, "Uplink still down");
                    tokio::time::sleep(self.backoff).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(DEFAULT_BACKOFF)
    }
}
