//! Level-triggered fleet reconciliation.
//!
//! Every tick observes the queue depth and the live instance inventory
//! from scratch, computes a plan with the pure
//! [`plan_fleet_actions`](shapecloud_core::fleet::plan_fleet_actions), and
//! applies it through the provider. No state is carried between ticks.

use std::sync::Arc;

use shapecloud_core::fleet::{plan_fleet_actions, QueueDepth};

use crate::broker::{BrokerClient, BrokerError};
use crate::provider::{ComputeProvider, ProviderError};

/// Errors that abort one reconciliation tick. The next tick retries from
/// fresh observations.
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Reconciles the GPU worker fleet against queue depth.
pub struct FleetController {
    broker: Arc<BrokerClient>,
    provider: Arc<dyn ComputeProvider>,
    queue: String,
}

impl FleetController {
    pub fn new(
        broker: Arc<BrokerClient>,
        provider: Arc<dyn ComputeProvider>,
        queue: impl Into<String>,
    ) -> Self {
        Self {
            broker,
            provider,
            queue: queue.into(),
        }
    }

    /// One tick: observe depth, then reconcile.
    pub async fn tick(&self) -> Result<(), FleetError> {
        let depth = self.broker.queue_depth(&self.queue).await?;
        self.reconcile(depth).await
    }

    /// Reconcile the fleet against an observed queue depth.
    pub async fn reconcile(&self, depth: QueueDepth) -> Result<(), FleetError> {
        if depth == QueueDepth::Unknown {
            // The queue was just declared; nothing is known about demand,
            // so neither start nor stop anything this tick.
            tracing::debug!(queue = %self.queue, "Queue depth unknown, skipping tick");
            return Ok(());
        }

        let workers = self.provider.describe_workers().await?;
        let plan = plan_fleet_actions(depth, &workers);
        if plan.is_empty() {
            return Ok(());
        }

        // Fire-and-forget: request the transitions and move on. Instances
        // still booting read as stopped next tick, and re-issuing their
        // start is safe.
        if !plan.start.is_empty() {
            tracing::info!(queue = %self.queue, starting = ?plan.start, "Starting GPU workers");
            self.provider.start_instances(&plan.start).await?;
        }
        if !plan.stop.is_empty() {
            tracing::info!(queue = %self.queue, stopping = ?plan.stop, "Stopping idle GPU workers");
            self.provider.stop_instances(&plan.stop).await?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
