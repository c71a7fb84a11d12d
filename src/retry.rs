use std::{future::Future, time::Duration};

use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_millis(500),
        }
    }
}

/// Runs `op` until it succeeds, fails permanently, or `max_retries` extra
/// attempts have been spent. Only errors for which `is_transient` returns true
/// are retried.
pub async fn retry<T, E, F, Fut, P>(policy: RetryPolicy, mut op: F, is_transient: P) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < policy.max_retries && is_transient(&e) => {
                attempt += 1;
                warn!(attempt, error = %e, "transient failure, retrying");
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
