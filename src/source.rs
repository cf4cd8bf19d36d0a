use crate::task::Task;

/// A pull-based provider of tasks.
///
/// Each call to [`next_task`](TaskSource::next_task) either yields a new task or
/// returns `None`, meaning the source is exhausted for good. The pool polls
/// exactly once per admission attempt and never polls again after `None`.
/// Implementations must not block.
pub trait TaskSource {
  type Error;

  fn next_task(&mut self) -> Option<Task<Self::Error>>;
}

impl<E, F> TaskSource for F
where
  F: FnMut() -> Option<Task<E>>,
{
  type Error = E;

  fn next_task(&mut self) -> Option<Task<E>> {
    self()
  }
}

/// Adapts an iterator of tasks into a [`TaskSource`].
#[derive(Debug)]
pub struct IterSource<I> {
  iter: I,
}

impl<E, I> TaskSource for IterSource<I>
where
  I: Iterator<Item = Task<E>>,
{
  type Error = E;

  fn next_task(&mut self) -> Option<Task<E>> {
    self.iter.next()
  }
}

pub fn from_iter<E, I>(iter: I) -> IterSource<I::IntoIter>
where
  I: IntoIterator<Item = Task<E>>,
{
  IterSource { iter: iter.into_iter() }
}

/// Wraps the caller's source and refuses to poll it after exhaustion.
///
/// A poll after `None` means the admission state machine is corrupted, so it panics.
pub(crate) struct GuardedSource<S> {
  inner: S,
  exhausted: bool,
  polls: u64,
}

impl<S: TaskSource> GuardedSource<S> {
  pub(crate) fn new(inner: S) -> Self {
    Self {
      inner,
      exhausted: false,
      polls: 0,
    }
  }

  pub(crate) fn is_exhausted(&self) -> bool {
    self.exhausted
  }

  pub(crate) fn polls(&self) -> u64 {
    self.polls
  }

  pub(crate) fn poll(&mut self) -> Option<Task<S::Error>> {
    assert!(
      !self.exhausted,
      "task source polled after it signalled exhaustion (admission state corrupted)"
    );
    self.polls += 1;
    let next = self.inner.next_task();
    if next.is_none() {
      self.exhausted = true;
    }
    next
  }
}
