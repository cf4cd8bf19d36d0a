use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

/// Summary of one pool run, produced on success and attached to the error on failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
  /// Wall time from the start of the run to the moment the report was taken.
  pub elapsed: Duration,
  pub started_count: u64,
  /// Failed tasks, whether the failure policy tolerated them or not.
  pub failed_count: u64,
  /// `started_count` per second of `elapsed`; `0.0` when no time elapsed.
  pub average_rate_hz: f64,
  /// Tasks still running when the report was taken. `0` on a clean success.
  pub in_flight_remaining: usize,
}

impl Report {
  pub fn elapsed_ms(&self) -> f64 {
    self.elapsed.as_secs_f64() * 1000.0
  }
}

impl fmt::Display for Report {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} started, {} failed, {} in flight in {:.1} ms ({:.2} Hz)",
      self.started_count,
      self.failed_count,
      self.in_flight_remaining,
      self.elapsed_ms(),
      self.average_rate_hz
    )
  }
}

/// Passive counters for one run, consulted when a report is built.
#[derive(Debug)]
pub(crate) struct RunStats {
  started_at: Instant,
  started_count: u64,
  failed_count: u64,
}

impl RunStats {
  pub(crate) fn start() -> Self {
    Self {
      started_at: Instant::now(),
      started_count: 0,
      failed_count: 0,
    }
  }

  /// Records one admission and returns its 1-based sequence number.
  pub(crate) fn record_start(&mut self) -> u64 {
    self.started_count += 1;
    self.started_count
  }

  pub(crate) fn record_failure(&mut self) {
    self.failed_count += 1;
  }

  pub(crate) fn started_count(&self) -> u64 {
    self.started_count
  }

  pub(crate) fn snapshot(&self, in_flight: usize) -> Report {
    let elapsed = self.started_at.elapsed();
    let seconds = elapsed.as_secs_f64();
    let average_rate_hz = if seconds > 0.0 {
      self.started_count as f64 / seconds
    } else {
      0.0
    };
    Report {
      elapsed,
      started_count: self.started_count,
      failed_count: self.failed_count,
      average_rate_hz,
      in_flight_remaining: in_flight,
    }
  }
}
