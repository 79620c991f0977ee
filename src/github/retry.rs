//! Rate-limit retry policy for the remote client.
//!
//! The policy is injected rather than fixed: callers pick how many attempts a
//! throttled request gets and how long to wait between them. Once attempts are
//! exhausted the failure surfaces as `BenchError::RateLimited`.

use std::time::Duration;

use anyhow::Result;

use crate::error::BenchError;

type DelayFn = Box<dyn Fn(u32, Option<Duration>) -> Duration + Send + Sync>;

pub struct RetryPolicy {
  pub max_attempts: u32,
  delay: DelayFn,
}

impl RetryPolicy {
  /// `delay(attempt, advised)` receives the 1-based attempt that was throttled
  /// and the server-advised wait, if any.
  pub fn new<F>(max_attempts: u32, delay: F) -> Self
  where
    F: Fn(u32, Option<Duration>) -> Duration + Send + Sync + 'static,
  {
    Self { max_attempts: max_attempts.max(1), delay: Box::new(delay) }
  }

  pub fn no_retry() -> Self {
    Self::new(1, |_, _| Duration::ZERO)
  }

  pub fn delay_for(&self, attempt: u32, advised: Option<Duration>) -> Duration {
    (self.delay)(attempt, advised)
  }
}

impl Default for RetryPolicy {
  /// One retry, honoring the server-advised delay (60s when none is given).
  fn default() -> Self {
    Self::new(2, |_, advised| advised.unwrap_or(Duration::from_secs(60)))
  }
}

impl std::fmt::Debug for RetryPolicy {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RetryPolicy").field("max_attempts", &self.max_attempts).finish()
  }
}

/// Outcome of one attempt at a throttled operation.
pub enum Attempt<T> {
  Done(T),
  Throttled { advised: Option<Duration>, detail: String },
}

/// Drive `op` until it completes or the policy runs out of attempts.
pub fn with_retry<T, F>(policy: &RetryPolicy, sleep: &dyn Fn(Duration), mut op: F) -> Result<T>
where
  F: FnMut() -> Result<Attempt<T>>,
{
  let mut attempt: u32 = 1;

  loop {
    match op()? {
      Attempt::Done(v) => return Ok(v),
      Attempt::Throttled { advised, detail } => {
        if attempt >= policy.max_attempts {
          return Err(BenchError::RateLimited(format!("{} (after {} attempt(s))", detail, attempt)).into());
        }

        let wait = policy.delay_for(attempt, advised);
        tracing::warn!("[github] request quota exhausted ({}); retrying in {:?}", detail, wait);
        sleep(wait);
        attempt += 1;
      }
    }
  }
}
