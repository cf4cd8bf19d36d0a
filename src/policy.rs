use crate::task::TaskInfo;

use std::fmt;
use std::sync::Arc;

/// Decision returned by a failure policy for one failed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
  /// Count the failure and keep admitting tasks as if this one had finished.
  Continue,
  /// Latch the task's error as the terminal error of the whole run.
  Abort,
}

impl From<bool> for FailureAction {
  fn from(keep_going: bool) -> Self {
    if keep_going {
      FailureAction::Continue
    } else {
      FailureAction::Abort
    }
  }
}

type PolicyFn<E> = dyn Fn(&E, &TaskInfo) -> FailureAction + Send + Sync + 'static;

/// What the pool does when a task resolves with an error.
///
/// The policy is consulted exactly once per failed task, before its slot is
/// released. A policy that panics is a bug in the caller; the panic is not caught.
pub enum FailurePolicy<E> {
  /// The first failure is terminal.
  AbortOnFirst,
  Custom(Arc<PolicyFn<E>>),
}

impl<E> FailurePolicy<E> {
  pub fn from_fn<F>(decide: F) -> Self
  where
    F: Fn(&E, &TaskInfo) -> FailureAction + Send + Sync + 'static,
  {
    FailurePolicy::Custom(Arc::new(decide))
  }

  /// Tolerates every failure; failures only show up in the report's `failed_count`.
  pub fn continue_always() -> Self {
    Self::from_fn(|_, _| FailureAction::Continue)
  }

  pub(crate) fn decide(&self, error: &E, task: &TaskInfo) -> FailureAction {
    match self {
      FailurePolicy::AbortOnFirst => FailureAction::Abort,
      FailurePolicy::Custom(decide) => decide(error, task),
    }
  }
}

impl<E> Default for FailurePolicy<E> {
  fn default() -> Self {
    FailurePolicy::AbortOnFirst
  }
}

impl<E> Clone for FailurePolicy<E> {
  fn clone(&self) -> Self {
    match self {
      FailurePolicy::AbortOnFirst => FailurePolicy::AbortOnFirst,
      FailurePolicy::Custom(decide) => FailurePolicy::Custom(decide.clone()),
    }
  }
}

impl<E> fmt::Debug for FailurePolicy<E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FailurePolicy::AbortOnFirst => f.write_str("AbortOnFirst"),
      FailurePolicy::Custom(_) => f.write_str("Custom(..)"),
    }
  }
}
