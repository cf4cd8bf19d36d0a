use futures_throttle::{run, RunOptions, Task};
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
#[error("request {0} was rejected by the API")]
struct ApiError(u64);

async fn call_api(id: u64, latency_ms: u64) -> Result<(), ApiError> {
  tokio::time::sleep(Duration::from_millis(latency_ms)).await;
  if id % 25 == 0 {
    return Err(ApiError(id));
  }
  info!("Request {} answered after {} ms", id, latency_ms);
  Ok(())
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();

  let pool_size = 4;
  let rate_hz = 8.0;
  let total_requests = 60u64;

  info!(
    "--- Rate Limited API Example (pool {}, target {} Hz, {} requests) ---",
    pool_size, rate_hz, total_requests
  );

  let mut next_id = 0u64;
  let source = move || {
    if next_id == total_requests {
      return None;
    }
    next_id += 1;
    let id = next_id;
    let latency_ms = rand::rng().random_range(20..120u64);
    Some(Task::labeled(format!("request-{id}"), call_api(id, latency_ms)))
  };

  let options = RunOptions::new()
    .with_name("api_pool")
    .with_target_rate(rate_hz)
    .on_failure(|error: &ApiError, task| {
      warn!("Tolerating failure of {}: {}", task, error);
      true
    });

  match run(source, pool_size, options).await {
    Ok(report) => info!("All requests processed: {}", report),
    Err(e) => warn!("Run aborted: {} (progress: {:?})", e, e.report()),
  }
  info!("--- Rate Limited API Example End ---");
}
