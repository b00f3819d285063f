//! Connection retry with exponential backoff and jitter.

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::store::{RecordStore, StoreConnection};
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// How connection attempts are retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Total attempts = `max_retries + 1`.
    pub max_retries: usize,
    pub backoff_base: Duration,
    pub connect_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        }
    }

    /// Wait before retry `attempt` (0-based): `base * 2^attempt + base * U[0,1)`.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let factor = 1u32 << attempt.min(16);
        let jitter = rand::thread_rng().gen_range(0.0..1.0);
        self.backoff_base.saturating_mul(factor) + self.backoff_base.mul_f64(jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&StoreConfig::default())
    }
}

/// Connect, retrying only transient faults. Returns the connection and the number of
/// retries it took.
///
/// A connect that exceeds `connect_timeout` counts as transient. Any other fault fails
/// immediately. Running out of retries is a [`StoreError::Connection`].
pub async fn connect_with_retry(
    store: &dyn RecordStore,
    policy: &RetryPolicy,
) -> Result<(Box<dyn StoreConnection>, usize), StoreError> {
    let mut last_error = None;

    for attempt in 0..=policy.max_retries {
        info!(
            attempt = attempt + 1,
            max_attempts = policy.max_retries + 1,
            store = %store.describe(),
            "Connecting to record store"
        );
        let outcome = match tokio::time::timeout(policy.connect_timeout, store.connect()).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::transient(format!(
                "connect timed out after {:?}",
                policy.connect_timeout
            ))),
        };

        match outcome {
            Ok(conn) => {
                info!(retries = attempt, "Record store connection established");
                return Ok((conn, attempt));
            }
            Err(e) if e.is_transient() => {
                if attempt < policy.max_retries {
                    let wait = policy.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "Retrying after transient store fault"
                    );
                    tokio::time::sleep(wait).await;
                }
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(StoreError::connection(format!(
        "max retries ({}) exceeded: {}",
        policy.max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}
