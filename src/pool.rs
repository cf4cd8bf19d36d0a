use crate::config::RunOptions;
use crate::error::PoolError;
use crate::policy::{FailureAction, FailurePolicy};
use crate::rate_limiter::RateLimiter;
use crate::report::{Report, RunStats};
use crate::source::{GuardedSource, TaskSource};
use crate::task::{TaskInfo, TaskToExecute};

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};

/// Runs every task `source` yields, at most `pool_size` at a time.
///
/// Resolves with a [`Report`] once the source is exhausted and every admitted
/// task has settled. Fails with the first failure the policy in `options`
/// refuses to tolerate; the error carries a [`Report`] snapshot. Even then the
/// returned future only resolves after the tasks already in flight have settled.
pub async fn run<S>(
  source: S,
  pool_size: usize,
  options: RunOptions<S::Error>,
) -> Result<Report, PoolError<S::Error>>
where
  S: TaskSource,
{
  ThrottlePool::new(pool_size, options)?.run(source).await
}

/// A validated pool configuration that can drive any number of runs.
///
/// Each call to [`run`](ThrottlePool::run) owns its own pool state, rate-limiter
/// window and counters; nothing is shared between runs.
pub struct ThrottlePool<E> {
  pool_name: Arc<String>,
  pool_size: usize,
  target_rate_hz: Option<f64>,
  failure_policy: FailurePolicy<E>,
}

impl<E> ThrottlePool<E> {
  pub fn new(pool_size: usize, options: RunOptions<E>) -> Result<Self, PoolError<E>> {
    if pool_size == 0 {
      return Err(PoolError::InvalidConfig("pool size must be at least 1".to_string()));
    }
    let target_rate_hz = options.effective_rate()?;

    Ok(Self {
      pool_name: Arc::new(options.name),
      pool_size,
      target_rate_hz,
      failure_policy: options.failure_policy,
    })
  }

  /// The name used to label this pool's logs and spans.
  pub fn name(&self) -> &str {
    &self.pool_name
  }

  /// Maximum number of tasks in flight at once.
  pub fn pool_size(&self) -> usize {
    self.pool_size
  }

  /// The pacing rate, `None` when task starts are not rate limited.
  pub fn target_rate_hz(&self) -> Option<f64> {
    self.target_rate_hz
  }

  pub async fn run<S>(&self, source: S) -> Result<Report, PoolError<E>>
  where
    S: TaskSource<Error = E>,
  {
    let span = info_span!(
      "throttle_pool_run",
      pool_name = %*self.pool_name,
      pool_size = self.pool_size
    );
    self.drive(source).instrument(span).await
  }

  async fn drive<S>(&self, source: S) -> Result<Report, PoolError<E>>
  where
    S: TaskSource<Error = E>,
  {
    let mut state = PoolState::new(self, source);
    let mut in_flight = FuturesUnordered::new();

    info!(
      pool_name = %*self.pool_name,
      pool_size = self.pool_size,
      target_rate_hz = ?self.target_rate_hz,
      target_interval = ?state.limiter.as_ref().map(RateLimiter::target_interval),
      "Run started."
    );

    // One admission attempt per slot. A short source stops the seeding early.
    for seed in 0..self.pool_size {
      let delay = state.seed_delay(seed);
      match state.admit() {
        Some(admitted) => in_flight.push(launch(admitted, delay)),
        None => break,
      }
    }

    // Every settlement frees one slot and triggers exactly one more attempt.
    while let Some(settled) = in_flight.next().await {
      state.settle(settled);
      if let Some(admitted) = state.admit() {
        let delay = state.launch_delay();
        in_flight.push(launch(admitted, delay));
      }
      debug_assert_eq!(state.in_flight, in_flight.len());
    }

    state.finish()
  }
}

impl<E> Clone for ThrottlePool<E> {
  fn clone(&self) -> Self {
    Self {
      pool_name: self.pool_name.clone(),
      pool_size: self.pool_size,
      target_rate_hz: self.target_rate_hz,
      failure_policy: self.failure_policy.clone(),
    }
  }
}

impl<E> fmt::Debug for ThrottlePool<E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ThrottlePool")
      .field("pool_name", &self.pool_name)
      .field("pool_size", &self.pool_size)
      .field("target_rate_hz", &self.target_rate_hz)
      .field("failure_policy", &self.failure_policy)
      .finish()
  }
}

/// A task that has been pulled from the source and holds a slot.
struct Admitted<E> {
  info: TaskInfo,
  future: TaskToExecute<E>,
}

enum TaskOutcome<E> {
  Succeeded,
  Failed(E),
  Panicked,
}

struct Settlement<E> {
  info: TaskInfo,
  duration: Duration,
  outcome: TaskOutcome<E>,
}

async fn launch<E>(admitted: Admitted<E>, delay: Duration) -> Settlement<E> {
  if !delay.is_zero() {
    trace!(task_id = admitted.info.id, ?delay, "Delaying task launch.");
    tokio::time::sleep(delay).await;
  }

  let started_at = Instant::now();
  let outcome = match AssertUnwindSafe(admitted.future).catch_unwind().await {
    Ok(Ok(())) => TaskOutcome::Succeeded,
    Ok(Err(task_error)) => TaskOutcome::Failed(task_error),
    Err(_panic_payload) => TaskOutcome::Panicked,
  };

  Settlement {
    info: admitted.info,
    duration: started_at.elapsed(),
    outcome,
  }
}

/// Mutable state of one run. Only the driving loop in `ThrottlePool::drive` touches it.
struct PoolState<'p, S: TaskSource> {
  pool_name: &'p str,
  failure_policy: &'p FailurePolicy<S::Error>,
  source: GuardedSource<S>,
  limiter: Option<RateLimiter>,
  stats: RunStats,
  in_flight: usize,
  terminal: Option<PoolError<S::Error>>,
}

impl<'p, S: TaskSource> PoolState<'p, S> {
  fn new(pool: &'p ThrottlePool<S::Error>, source: S) -> Self {
    Self {
      pool_name: &pool.pool_name,
      failure_policy: &pool.failure_policy,
      source: GuardedSource::new(source),
      limiter: pool
        .target_rate_hz
        .map(|rate_hz| RateLimiter::new(pool.pool_size, rate_hz)),
      stats: RunStats::start(),
      in_flight: 0,
      terminal: None,
    }
  }

  fn seed_delay(&self, seed: usize) -> Duration {
    self
      .limiter
      .as_ref()
      .map_or(Duration::ZERO, |limiter| limiter.seed_delay(seed))
  }

  fn launch_delay(&self) -> Duration {
    self
      .limiter
      .as_ref()
      .map_or(Duration::ZERO, RateLimiter::launch_delay)
  }

  /// One admission attempt: polls the source at most once.
  fn admit(&mut self) -> Option<Admitted<S::Error>> {
    if self.terminal.is_some() || self.source.is_exhausted() {
      return None;
    }

    match self.source.poll() {
      None => {
        debug!(
          pool_name = %self.pool_name,
          started = self.stats.started_count(),
          in_flight = self.in_flight,
          "Task source exhausted."
        );
        None
      }
      Some(task) => {
        let id = self.stats.record_start();
        self.in_flight += 1;
        trace!(
          pool_name = %self.pool_name,
          task_id = id,
          label = ?task.label,
          in_flight = self.in_flight,
          "Admitted task."
        );
        Some(Admitted {
          info: TaskInfo { id, label: task.label },
          future: task.future,
        })
      }
    }
  }

  fn settle(&mut self, settled: Settlement<S::Error>) {
    let Settlement { info, duration, outcome } = settled;

    if self.terminal.is_some() {
      self.in_flight -= 1;
      debug!(
        pool_name = %self.pool_name,
        task_id = info.id,
        in_flight = self.in_flight,
        "Task settled after the run was aborted; outcome ignored."
      );
      return;
    }

    if let Some(limiter) = self.limiter.as_mut() {
      limiter.record(duration);
    }

    match outcome {
      TaskOutcome::Succeeded => {
        self.in_flight -= 1;
        trace!(pool_name = %self.pool_name, task_id = info.id, ?duration, "Task succeeded.");
      }
      TaskOutcome::Failed(task_error) => {
        self.stats.record_failure();
        let action = self.failure_policy.decide(&task_error, &info);
        self.in_flight -= 1;
        match action {
          FailureAction::Continue => {
            warn!(
              pool_name = %self.pool_name,
              task_id = info.id,
              label = ?info.label,
              "Task failed; failure policy lets the run continue."
            );
          }
          FailureAction::Abort => {
            debug!(
              pool_name = %self.pool_name,
              task_id = info.id,
              in_flight = self.in_flight,
              "Task failed; latching terminal error, no further admissions."
            );
            let report = self.stats.snapshot(self.in_flight);
            self.terminal = Some(PoolError::TaskFailed {
              task: info,
              error: task_error,
              report,
            });
          }
        }
      }
      TaskOutcome::Panicked => {
        self.stats.record_failure();
        self.in_flight -= 1;
        error!(
          pool_name = %self.pool_name,
          task_id = info.id,
          label = ?info.label,
          "Task panicked during execution; aborting the run."
        );
        let report = self.stats.snapshot(self.in_flight);
        self.terminal = Some(PoolError::TaskPanicked { task: info, report });
      }
    }
  }

  fn finish(self) -> Result<Report, PoolError<S::Error>> {
    debug_assert_eq!(self.in_flight, 0);

    match self.terminal {
      Some(terminal_error) => {
        warn!(
          pool_name = %self.pool_name,
          polls = self.source.polls(),
          "Run aborted after in-flight tasks drained."
        );
        Err(terminal_error)
      }
      None => {
        let report = self.stats.snapshot(self.in_flight);
        info!(
          pool_name = %self.pool_name,
          polls = self.source.polls(),
          started = report.started_count,
          failed = report.failed_count,
          elapsed_ms = report.elapsed_ms(),
          average_rate_hz = report.average_rate_hz,
          "Run completed."
        );
        Ok(report)
      }
    }
  }
}
