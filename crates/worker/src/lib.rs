//! Worker loop: consume the GPU queue and execute pipeline runs.
//!
//! One message = one job id = one run to a terminal state. A run failure
//! lands on its own progress record and never takes the loop down.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use shapecloud_core::types::DbId;
use shapecloud_fleet::BrokerClient;
use shapecloud_pipeline::{run_pipeline, BlobStore, JobQueue, PipelineError};

/// Default queue poll interval.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Poll interval from `WORKER_POLL_SECS`, defaulting to 1 second.
pub fn poll_interval_from_env() -> Duration {
    std::env::var("WORKER_POLL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_POLL_INTERVAL)
}

/// Broker-backed [`JobQueue`] used for successor enqueues.
pub struct BrokerJobQueue(pub Arc<BrokerClient>);

#[async_trait]
impl JobQueue for BrokerJobQueue {
    async fn publish(&self, queue: &str, payload: &str) -> Result<(), PipelineError> {
        self.0
            .publish(queue, payload)
            .await
            .map_err(|e| PipelineError::Infrastructure(format!("broker publish failed: {e}")))
    }
}

/// Run the worker loop until `cancel` is triggered.
///
/// Each tick pops at most one message from `queue`; an empty queue is a
/// no-op tick, a broker failure is logged and retried next tick.
pub async fn run_worker(
    pool: PgPool,
    broker: Arc<BrokerClient>,
    store: Arc<dyn BlobStore>,
    engine_bin: PathBuf,
    queue: &str,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    let job_queue = BrokerJobQueue(Arc::clone(&broker));
    let mut ticker = tokio::time::interval(poll_interval);

    tracing::info!(
        queue,
        poll_interval_ms = poll_interval.as_millis() as u64,
        engine = %engine_bin.display(),
        "Worker started",
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Worker shutting down");
                break;
            }
            _ = ticker.tick() => {
                match broker.pop(queue).await {
                    Ok(Some(payload)) => {
                        let Ok(job_id) = payload.trim().parse::<DbId>() else {
                            tracing::warn!(payload = %payload, "Discarding unparseable queue message");
                            continue;
                        };
                        tracing::info!(job_id, "Run claimed from queue");
                        let outcome = run_pipeline(
                            &pool,
                            store.as_ref(),
                            &job_queue,
                            &engine_bin,
                            job_id,
                        )
                        .await;
                        tracing::info!(job_id, ?outcome, "Run reached terminal state");
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "Queue poll failed, retrying next tick");
                    }
                }
            }
        }
    }
}
