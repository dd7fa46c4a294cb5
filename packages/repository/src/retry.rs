//! Bounded fixed-delay retry for store reads.
//!
//! Only reads go through here. Writes are never retried.

use std::time::Duration;

use crate::RepositoryError;

/// Runs `op` up to `max_attempts` times, sleeping `delay` between attempts
/// while the error is retryable.
///
/// # Errors
///
/// Returns the last error once attempts run out, or the first
/// non-retryable error.
pub async fn with_retry<T, F, Fut>(
    label: &str,
    max_attempts: u32,
    delay: Duration,
    mut op: F,
) -> Result<T, RepositoryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RepositoryError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                log::warn!("  {label} failed: {e}");
                log::warn!("  retry {attempt}/{} in {delay:?}...", max_attempts - 1);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if attempt > 1 {
                    log::error!("{label} failed after {attempt} attempts: {e}");
                }
                return Err(e);
            }
        }
    }
}
