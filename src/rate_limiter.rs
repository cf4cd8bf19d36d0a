//! Adaptive start-rate pacing for the pool.
//!
//! The limiter spaces task launches so that the aggregate start rate of the
//! whole pool approximates a target frequency. The nominal spacing between two
//! starts anywhere in the pool is `target_interval = pool_size / rate_hz`.
//!
//! A fixed delay of `target_interval` per launch under-paces slow tasks and
//! bursts on fast ones, so the limiter keeps a window of the last `pool_size`
//! task durations and only injects what the tasks' own latency does not
//! already cover:
//!
//! - window not yet full: `delay = target_interval`
//! - window full: `delay = max(0, target_interval - mean(window))`

use std::collections::VecDeque;
use std::time::Duration;

use tracing::trace;

#[derive(Debug)]
pub(crate) struct RateLimiter {
  target_interval: Duration,
  window: DurationWindow,
}

impl RateLimiter {
  /// `rate_hz` must be finite and strictly positive; the caller validates it.
  pub(crate) fn new(pool_size: usize, rate_hz: f64) -> Self {
    let interval_nanos = (pool_size as f64 / rate_hz * 1e9).round() as u64;
    let target_interval = Duration::from_nanos(interval_nanos);
    Self {
      target_interval,
      window: DurationWindow::new(pool_size),
    }
  }

  pub(crate) fn target_interval(&self) -> Duration {
    self.target_interval
  }

  /// Staggering delay for the `index`-th (0-based) seed admission.
  pub(crate) fn seed_delay(&self, index: usize) -> Duration {
    let index = u32::try_from(index).unwrap_or(u32::MAX);
    self.target_interval.saturating_mul(index)
  }

  /// Delay to apply before launching a task admitted after a settlement.
  pub(crate) fn launch_delay(&self) -> Duration {
    let delay = match self.window.mean() {
      Some(mean) if self.window.is_full() => self.target_interval.saturating_sub(mean),
      _ => self.target_interval,
    };
    trace!(
      delay_ms = delay.as_secs_f64() * 1000.0,
      window_len = self.window.len(),
      "Rate limiter computed launch delay."
    );
    delay
  }

  pub(crate) fn record(&mut self, duration: Duration) {
    self.window.push(duration);
  }
}

/// Bounded FIFO of recent durations with a running sum.
///
/// Storage grows with the samples actually recorded, never up front, so a huge
/// pool size costs nothing until tasks settle.
#[derive(Debug)]
struct DurationWindow {
  capacity: usize,
  samples: VecDeque<Duration>,
  sum: Duration,
}

impl DurationWindow {
  fn new(capacity: usize) -> Self {
    let capacity = capacity.max(1);
    Self {
      capacity,
      samples: VecDeque::new(),
      sum: Duration::ZERO,
    }
  }

  fn push(&mut self, sample: Duration) {
    if self.samples.len() == self.capacity {
      if let Some(oldest) = self.samples.pop_front() {
        self.sum = self.sum.saturating_sub(oldest);
      }
    }
    self.samples.push_back(sample);
    self.sum = self.sum.saturating_add(sample);
  }

  fn len(&self) -> usize {
    self.samples.len()
  }

  fn is_full(&self) -> bool {
    self.samples.len() == self.capacity
  }

  fn mean(&self) -> Option<Duration> {
    if self.samples.is_empty() {
      return None;
    }
    let mean_nanos = self.sum.as_nanos() / self.samples.len() as u128;
    Some(Duration::from_nanos(u64::try_from(mean_nanos).unwrap_or(u64::MAX)))
  }
}
