use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// A descriptive label a caller may attach to a task, typically a `String`.
pub type TaskLabel = String;

/// The type of future that the pool executes.
/// It must be `Send` and `'static`, and resolve to `Ok(())` or the task's error `E`.
pub type TaskToExecute<E> = Pin<Box<dyn Future<Output = Result<(), E>> + Send + 'static>>;

/// One unit of work handed to the pool by a [`TaskSource`](crate::TaskSource).
///
/// The future is not polled before the pool launches it, so any rate-limiter
/// delay happens before the task's work begins.
pub struct Task<E> {
  pub(crate) label: Option<TaskLabel>,
  pub(crate) future: TaskToExecute<E>,
}

impl<E> Task<E> {
  pub fn new<F>(future: F) -> Self
  where
    F: Future<Output = Result<(), E>> + Send + 'static,
  {
    Self {
      label: None,
      future: Box::pin(future),
    }
  }

  /// Creates a task carrying a caller label, reported back through [`TaskInfo`].
  pub fn labeled<F>(label: impl Into<TaskLabel>, future: F) -> Self
  where
    F: Future<Output = Result<(), E>> + Send + 'static,
  {
    Self {
      label: Some(label.into()),
      future: Box::pin(future),
    }
  }

  pub fn label(&self) -> Option<&str> {
    self.label.as_deref()
  }
}

impl<E> fmt::Debug for Task<E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Task")
      .field("label", &self.label)
      .finish_non_exhaustive()
  }
}

/// Identity of an admitted task, as seen by the failure policy and in errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
  /// 1-based admission order within one run.
  pub id: u64,
  pub label: Option<TaskLabel>,
}

impl fmt::Display for TaskInfo {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.label {
      Some(label) => write!(f, "#{} ({})", self.id, label),
      None => write!(f, "#{}", self.id),
    }
  }
}
