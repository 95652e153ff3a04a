use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Errors that know whether repeating the operation could help.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for crate::error::DbError {
    fn is_transient(&self) -> bool {
        crate::error::DbError::is_transient(self)
    }
}

/// Runs `op` up to `max_attempts` times, sleeping `100ms * attempt` between
/// transient failures. Non-transient errors return immediately.
pub async fn with_retry<T, E, F, Fut>(operation: &str, max_attempts: u32, mut op: F) -> Result<T, E>
where
    E: Transient + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                warn!(
                    "{} failed on attempt {}/{}: {}; retrying",
                    operation, attempt, max_attempts, e
                );
                tokio::time::sleep(Duration::from_millis(100 * attempt as u64)).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
