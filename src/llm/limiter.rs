//! Outbound call pacing and retry for the remote model
//!
//! One limiter instance per orchestration session; the last-call timestamp
//! must not be shared across sessions.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::warn;

use crate::error::ModelError;

/// Default gap enforced between consecutive model calls
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(2);

/// How long to back off after the service reports throttling
pub const DEFAULT_THROTTLE_COOLDOWN: Duration = Duration::from_secs(30);

/// Retry behavior for the two recoverable model error kinds.
///
/// `None` caps mean "retry forever", the intended production behavior for
/// this domain. Tests and latency-bounded deployments set finite caps.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub cooldown: Duration,
    pub max_throttle_retries: Option<u32>,
    pub max_transient_retries: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_THROTTLE_COOLDOWN,
            max_throttle_retries: None,
            max_transient_retries: None,
        }
    }
}

/// Minimum-interval gate around a "send to remote model" operation.
///
/// A call arriving less than `min_interval` after the previous completed
/// call sleeps for the remainder first. Throttling errors sleep the policy
/// cooldown and retry the same call; server faults retry immediately.
pub struct RateLimiter {
    min_interval: Duration,
    policy: RetryPolicy,
    last_call: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self::with_policy(min_interval, RetryPolicy::default())
    }

    pub fn with_policy(min_interval: Duration, policy: RetryPolicy) -> Self {
        Self {
            min_interval,
            policy,
            last_call: None,
        }
    }

    /// Run `operation` through the gate, retrying per the policy.
    ///
    /// The operation is re-invoked verbatim on every retry. The last-call
    /// timestamp is only advanced when an attempt succeeds.
    pub async fn execute<T, F, Fut>(&mut self, mut operation: F) -> Result<T, ModelError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ModelError>>,
    {
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }

        let mut throttle_retries = 0u32;
        let mut transient_retries = 0u32;

        loop {
            match operation().await {
                Ok(value) => {
                    self.last_call = Some(Instant::now());
                    return Ok(value);
                }
                Err(ModelError::Throttled(msg)) => {
                    if exhausted(self.policy.max_throttle_retries, throttle_retries) {
                        return Err(ModelError::Throttled(msg));
                    }
                    throttle_retries += 1;
                    warn!(
                        attempt = throttle_retries,
                        cooldown_secs = self.policy.cooldown.as_secs(),
                        "Model throttled, backing off: {}",
                        msg
                    );
                    sleep(self.policy.cooldown).await;
                }
                Err(ModelError::ServerFault(msg)) => {
                    if exhausted(self.policy.max_transient_retries, transient_retries) {
                        return Err(ModelError::ServerFault(msg));
                    }
                    transient_retries += 1;
                    warn!(attempt = transient_retries, "Model server fault, retrying: {}", msg);
                }
                Err(other) => return Err(other),
            }
        }
    }
}

fn exhausted(cap: Option<u32>, used: u32) -> bool {
    cap.is_some_and(|cap| used >= cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    fn test_policy(cooldown_secs: u64) -> RetryPolicy {
        RetryPolicy {
            cooldown: Duration::from_secs(cooldown_secs),
            max_throttle_retries: None,
            max_transient_retries: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_call_waits_out_interval() {
        let mut limiter = RateLimiter::new(Duration::from_secs(2));
        let timestamps: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..2 {
            let timestamps = Arc::clone(&timestamps);
            limiter
                .execute(move || {
                    let timestamps = Arc::clone(&timestamps);
                    async move {
                        timestamps.lock().unwrap().push(Instant::now());
                        Ok::<_, ModelError>(())
                    }
                })
                .await
                .unwrap();
        }

        let timestamps = timestamps.lock().unwrap();
        assert_eq!(timestamps.len(), 2);
        assert!(timestamps[1] - timestamps[0] >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_after_interval_does_not_wait() {
        let mut limiter = RateLimiter::new(Duration::from_secs(2));

        limiter.execute(|| async { Ok::<_, ModelError>(()) }).await.unwrap();
        sleep(Duration::from_secs(3)).await;

        let start = Instant::now();
        limiter.execute(|| async { Ok::<_, ModelError>(()) }).await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttling_sleeps_cooldown_per_retry() {
        let mut limiter = RateLimiter::with_policy(Duration::ZERO, test_policy(30));
        let attempts = Arc::new(AtomicU32::new(0));

        let start = Instant::now();
        let attempts_in = Arc::clone(&attempts);
        let result = limiter
            .execute(move || {
                let attempts = Arc::clone(&attempts_in);
                async move {
                    // Throttled twice, then succeed
                    if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ModelError::Throttled("quota".into()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_fault_retries_immediately() {
        let mut limiter = RateLimiter::with_policy(Duration::ZERO, test_policy(30));
        let attempts = Arc::new(AtomicU32::new(0));

        let start = Instant::now();
        let attempts_in = Arc::clone(&attempts);
        let result = limiter
            .execute(move || {
                let attempts = Arc::clone(&attempts_in);
                async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(ModelError::ServerFault("500".into()))
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_retry_cap() {
        let policy = RetryPolicy {
            cooldown: Duration::from_secs(30),
            max_throttle_retries: Some(1),
            max_transient_retries: None,
        };
        let mut limiter = RateLimiter::with_policy(Duration::ZERO, policy);
        let attempts = Arc::new(AtomicU32::new(0));

        let attempts_in = Arc::clone(&attempts);
        let result: Result<(), _> = limiter
            .execute(move || {
                let attempts = Arc::clone(&attempts_in);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(ModelError::Throttled("quota".into()))
                }
            })
            .await;

        assert!(matches!(result, Err(ModelError::Throttled(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_is_not_retried() {
        let mut limiter = RateLimiter::new(Duration::from_secs(2));
        let attempts = Arc::new(AtomicU32::new(0));

        let attempts_in = Arc::clone(&attempts);
        let result: Result<(), _> = limiter
            .execute(move || {
                let attempts = Arc::clone(&attempts_in);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(ModelError::Rejected("bad request".into()))
                }
            })
            .await;

        assert!(matches!(result, Err(ModelError::Rejected(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        // A failed attempt does not arm the interval gate
        let start = Instant::now();
        limiter.execute(|| async { Ok::<_, ModelError>(()) }).await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
