//! Pure fleet reconciliation.
//!
//! The controller observes the GPU queue depth and the current worker
//! instances each tick and computes the actions for that tick from scratch
//! — no memory of prior ticks, so a stale observation self-corrects on the
//! next one.

use serde::Serialize;

/// Number of ready messages in the GPU work queue.
///
/// `Unknown` means the queue could not be inspected (it did not exist yet
/// and was just declared). Callers must never treat `Unknown` as empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueDepth {
    Unknown,
    Ready(u64),
}

/// One compute instance as reported by the provider.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerDescriptor {
    /// Provider-assigned instance id, used for start/stop requests.
    pub instance_id: String,
    /// Human-readable instance name.
    pub name: String,
    /// Public hostname; empty while the instance is stopped (or still
    /// booting, which start idempotency makes safe).
    pub hostname: String,
    /// Whether the instance carries the GPU capability tag.
    pub gpu: bool,
}

impl WorkerDescriptor {
    /// An instance with a hostname is treated as running.
    pub fn is_running(&self) -> bool {
        !self.hostname.is_empty()
    }
}

/// Instance ids to start and stop this tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FleetPlan {
    pub start: Vec<String>,
    pub stop: Vec<String>,
}

impl FleetPlan {
    pub fn is_empty(&self) -> bool {
        self.start.is_empty() && self.stop.is_empty()
    }
}

/// Compute this tick's actions from the observed state.
///
/// - depth > 0: start up to `depth` currently stopped GPU workers (never
///   more than the queue depth; if fewer exist, start them all).
/// - depth == 0: stop every running GPU worker.
/// - depth unknown: no actions.
///
/// Non-GPU instances are never touched.
pub fn plan_fleet_actions(depth: QueueDepth, workers: &[WorkerDescriptor]) -> FleetPlan {
    let depth = match depth {
        QueueDepth::Unknown => return FleetPlan::default(),
        QueueDepth::Ready(n) => n,
    };

    let gpu_workers = workers.iter().filter(|w| w.gpu);

    if depth == 0 {
        return FleetPlan {
            start: Vec::new(),
            stop: gpu_workers
                .filter(|w| w.is_running())
                .map(|w| w.instance_id.clone())
                .collect(),
        };
    }

    FleetPlan {
        start: gpu_workers
            .filter(|w| !w.is_running())
            .take(depth as usize)
            .map(|w| w.instance_id.clone())
            .collect(),
        stop: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(id: &str, hostname: &str, gpu: bool) -> WorkerDescriptor {
        WorkerDescriptor {
            instance_id: id.to_string(),
            name: format!("worker-{id}"),
            hostname: hostname.to_string(),
            gpu,
        }
    }

    #[test]
    fn zero_depth_stops_all_running_gpu_workers() {
        let workers = vec![
            worker("i-1", "host-1.internal", true),
            worker("i-2", "host-2.internal", true),
            worker("i-3", "host-3.internal", true),
        ];
        let plan = plan_fleet_actions(QueueDepth::Ready(0), &workers);
        assert!(plan.start.is_empty());
        assert_eq!(plan.stop, vec!["i-1", "i-2", "i-3"]);
    }

    #[test]
    fn positive_depth_starts_only_stopped_gpu_workers() {
        let workers = vec![
            worker("i-1", "", true),
            worker("i-2", "", true),
            worker("i-3", "host-3.internal", true),
        ];
        let plan = plan_fleet_actions(QueueDepth::Ready(5), &workers);
        assert_eq!(plan.start, vec!["i-1", "i-2"]);
        assert!(plan.stop.is_empty());
    }

    #[test]
    fn never_starts_more_workers_than_queue_depth() {
        let workers = vec![
            worker("i-1", "", true),
            worker("i-2", "", true),
            worker("i-3", "", true),
        ];
        let plan = plan_fleet_actions(QueueDepth::Ready(2), &workers);
        assert_eq!(plan.start.len(), 2);
    }

    #[test]
    fn unknown_depth_is_a_no_op() {
        let workers = vec![worker("i-1", "", true), worker("i-2", "host.internal", true)];
        let plan = plan_fleet_actions(QueueDepth::Unknown, &workers);
        assert!(plan.is_empty());
    }

    #[test]
    fn non_gpu_workers_are_never_touched() {
        let workers = vec![
            worker("i-1", "host-1.internal", false),
            worker("i-2", "", false),
        ];
        assert!(plan_fleet_actions(QueueDepth::Ready(0), &workers).is_empty());
        assert!(plan_fleet_actions(QueueDepth::Ready(4), &workers).is_empty());
    }

    #[test]
    fn zero_depth_with_nothing_running_is_empty() {
        let workers = vec![worker("i-1", "", true)];
        assert!(plan_fleet_actions(QueueDepth::Ready(0), &workers).is_empty());
    }
}
