//! Bounded optimistic-concurrency retry combinator.
//!
//! Wraps a single conditional-write operation against any row-versioned
//! store. The operation reports whether its conditional write applied, lost
//! to a concurrent writer, or found the target row missing; the combinator
//! owns the attempt budget and the backoff schedule.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::session::SessionError;

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    20
}

fn default_max_delay_ms() -> u64 {
    150
}

/// Tuning for the optimistic retry loop.
///
/// Loaded from configuration; defaults give the 20ms/60ms/150ms schedule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetrySettings {
    /// Total conditional-write attempts per delta (including the first).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt; later delays grow geometrically.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound on any single delay.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetrySettings {
    /// Delay after a failed attempt (1-based): base * 3^(attempt-1), capped.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 3u64.saturating_pow(attempt.saturating_sub(1));
        let ms = self.base_delay_ms.saturating_mul(factor);
        Duration::from_millis(ms.min(self.max_delay_ms))
    }
}

/// Outcome of one conditional-write attempt.
#[derive(Debug)]
pub enum Attempt<T> {
    /// The conditional write succeeded.
    Applied(T),
    /// The version tag moved underneath us; the write was not applied.
    Conflict,
    /// The target row does not exist (deleted, or not yet visible).
    RowMissing,
}

/// Runs a conditional-write operation under the optimistic retry protocol.
///
/// - `Conflict` retries after a growing delay; exhausting the budget yields
///   a terminal `ConcurrencyConflict` for `entity` - never a silent drop.
/// - `RowMissing` is retried while attempts remain (the row may be
///   mid-creation) and becomes a benign no-op (`Ok(None)`) on the final
///   attempt, since there is nothing left to update.
/// - Any other error aborts immediately without retry.
pub async fn with_optimistic_retry<T, F, Fut>(
    settings: &RetrySettings,
    entity: &str,
    mut op: F,
) -> Result<Option<T>, SessionError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Attempt<T>, SessionError>>,
{
    let max_attempts = settings.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        match op(attempt).await? {
            Attempt::Applied(value) => return Ok(Some(value)),
            Attempt::RowMissing => {
                if attempt == max_attempts {
                    return Ok(None);
                }
                tracing::debug!(entity, attempt, "row missing, retrying conditional write");
            }
            Attempt::Conflict => {
                if attempt == max_attempts {
                    return Err(SessionError::conflict(entity));
                }
                tracing::debug!(entity, attempt, "version conflict, retrying conditional write");
            }
        }
        tokio::time::sleep(settings.delay_after(attempt)).await;
    }
    Err(SessionError::conflict(entity))
}
