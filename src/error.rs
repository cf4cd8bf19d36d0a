use crate::report::Report;
use crate::task::TaskInfo;

use thiserror::Error;

/// Errors that end a `futures_throttle` run.
///
/// Task failures carry the original task error untouched, together with the
/// [`Report`] snapshot taken when the failure became terminal.
#[derive(Error, Debug)]
pub enum PoolError<E> {
  #[error("Task {task} failed and the failure policy aborted the run: {error}")]
  TaskFailed {
    task: TaskInfo,
    #[source]
    error: E,
    report: Report,
  },

  #[error("Task {task} panicked during execution")]
  TaskPanicked { task: TaskInfo, report: Report },

  #[error("Invalid pool configuration: {0}")]
  InvalidConfig(String),
}

impl<E> PoolError<E> {
  /// Progress snapshot taken when the run failed, if it got that far.
  pub fn report(&self) -> Option<&Report> {
    match self {
      PoolError::TaskFailed { report, .. } | PoolError::TaskPanicked { report, .. } => Some(report),
      PoolError::InvalidConfig(_) => None,
    }
  }

  /// The task whose outcome ended the run.
  pub fn task(&self) -> Option<&TaskInfo> {
    match self {
      PoolError::TaskFailed { task, .. } | PoolError::TaskPanicked { task, .. } => Some(task),
      PoolError::InvalidConfig(_) => None,
    }
  }

  pub fn task_error(&self) -> Option<&E> {
    match self {
      PoolError::TaskFailed { error, .. } => Some(error),
      _ => None,
    }
  }

  /// Unwraps the original task error, discarding the report.
  pub fn into_task_error(self) -> Option<E> {
    match self {
      PoolError::TaskFailed { error, .. } => Some(error),
      _ => None,
    }
  }
}
