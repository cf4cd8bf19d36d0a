use crate::error::PoolError;
use crate::policy::{FailureAction, FailurePolicy};
use crate::task::TaskInfo;

use std::fmt;

pub(crate) const DEFAULT_POOL_NAME: &str = "throttle_pool";

/// Per-run options for a throttled pool.
///
/// ## Field semantics
/// - `target_rate_hz`: average task starts per second across the whole pool.
///   `None` or `0.0` disables pacing; negative, NaN and infinite rates are rejected.
/// - `failure_policy`: consulted on every task failure; defaults to aborting on the first.
/// - `name`: only used to label logs and spans.
pub struct RunOptions<E> {
  pub name: String,
  pub target_rate_hz: Option<f64>,
  pub failure_policy: FailurePolicy<E>,
}

impl<E> RunOptions<E> {
  pub fn new() -> Self {
    Self {
      name: DEFAULT_POOL_NAME.to_string(),
      target_rate_hz: None,
      failure_policy: FailurePolicy::default(),
    }
  }

  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  pub fn with_target_rate(mut self, rate_hz: f64) -> Self {
    self.target_rate_hz = Some(rate_hz);
    self
  }

  pub fn with_failure_policy(mut self, policy: FailurePolicy<E>) -> Self {
    self.failure_policy = policy;
    self
  }

  /// Shorthand for a custom failure policy. Returning `true` (or
  /// [`FailureAction::Continue`]) tolerates the failure.
  pub fn on_failure<F, A>(self, decide: F) -> Self
  where
    F: Fn(&E, &TaskInfo) -> A + Send + Sync + 'static,
    A: Into<FailureAction>,
  {
    self.with_failure_policy(FailurePolicy::from_fn(move |error, task| decide(error, task).into()))
  }

  /// Returns the effective pacing rate, `None` when pacing is disabled.
  pub(crate) fn effective_rate(&self) -> Result<Option<f64>, PoolError<E>> {
    match self.target_rate_hz {
      None => Ok(None),
      Some(rate) if rate == 0.0 => Ok(None),
      Some(rate) if rate.is_finite() && rate > 0.0 => Ok(Some(rate)),
      Some(rate) => Err(PoolError::InvalidConfig(format!(
        "target rate must be a finite, non-negative number of Hz, got {rate}"
      ))),
    }
  }
}

impl<E> Default for RunOptions<E> {
  fn default() -> Self {
    Self::new()
  }
}

impl<E> Clone for RunOptions<E> {
  fn clone(&self) -> Self {
    Self {
      name: self.name.clone(),
      target_rate_hz: self.target_rate_hz,
      failure_policy: self.failure_policy.clone(),
    }
  }
}

impl<E> fmt::Debug for RunOptions<E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RunOptions")
      .field("name", &self.name)
      .field("target_rate_hz", &self.target_rate_hz)
      .field("failure_policy", &self.failure_policy)
      .finish()
  }
}
