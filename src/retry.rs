use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tracing::warn;

/// Bounded retry with exponential backoff for remote-open operations.
///
/// The first attempt is free; `max_retries` more are made after failures,
/// sleeping `base_backoff`, then twice that, and so on between attempts.
/// After exhaustion the last error is returned and the caller decides what
/// abandoning the operation means (for an archive: a recorded per-archive
/// failure, not a fatal one).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries => {
                    let backoff = self.base_backoff * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    warn!(
                        "{what} failed (attempt {attempt}/{}), retrying in {backoff:?}: {e}",
                        self.max_retries + 1
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_backoff: Duration::from_millis(0),
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let result = instant_policy(3)
            .run("open", || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        bail!("transient");
                    }
                    Ok(n)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = instant_policy(2)
            .run("open", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { bail!("always") }
            })
            .await;
        assert!(result.is_err());
        // one initial attempt plus two retries
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
