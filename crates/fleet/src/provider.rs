//! Compute provider access behind a trait seam.
//!
//! The controller only observes instances and issues batched start/stop
//! requests; both are idempotent at the provider boundary, so re-issuing a
//! start against an instance that is already booting is safe.

use async_trait::async_trait;
use aws_sdk_ec2::types::Filter;

use shapecloud_core::fleet::WorkerDescriptor;

/// Tag identifying instances that belong to the worker fleet.
const FLEET_TAG: &str = "shapecloud:fleet";

/// Tag whose value `gpu` marks a GPU-capable instance.
const CAPABILITY_TAG: &str = "shapecloud:capability";

/// Errors from the compute provider API.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Compute provider error: {0}")]
    Api(String),
}

/// Instance inventory and batched state-transition requests.
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// Describe every fleet instance, running or stopped.
    async fn describe_workers(&self) -> Result<Vec<WorkerDescriptor>, ProviderError>;

    /// Request a start of the given instances. Idempotent.
    async fn start_instances(&self, ids: &[String]) -> Result<(), ProviderError>;

    /// Request a stop of the given instances. Idempotent.
    async fn stop_instances(&self, ids: &[String]) -> Result<(), ProviderError>;
}

/// EC2-backed provider. Fleet membership and GPU capability come from
/// instance tags; the hostname is the public DNS name, which EC2 leaves
/// empty while an instance is stopped.
pub struct Ec2Provider {
    client: aws_sdk_ec2::Client,
}

impl Ec2Provider {
    /// Build a client from the ambient AWS environment (credentials
    /// chain, region).
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            client: aws_sdk_ec2::Client::new(&config),
        }
    }
}

#[async_trait]
impl ComputeProvider for Ec2Provider {
    async fn describe_workers(&self) -> Result<Vec<WorkerDescriptor>, ProviderError> {
        let response = self
            .client
            .describe_instances()
            .filters(
                Filter::builder()
                    .name(format!("tag:{FLEET_TAG}"))
                    .values("worker")
                    .build(),
            )
            .send()
            .await
            .map_err(|e| ProviderError::Api(e.to_string()))?;

        let mut workers = Vec::new();
        for reservation in response.reservations() {
            for instance in reservation.instances() {
                let tags = instance.tags();
                workers.push(WorkerDescriptor {
                    instance_id: instance.instance_id().unwrap_or_default().to_string(),
                    name: tag_value(tags, "Name").unwrap_or_default(),
                    hostname: instance.public_dns_name().unwrap_or_default().to_string(),
                    gpu: tag_value(tags, CAPABILITY_TAG).as_deref() == Some("gpu"),
                });
            }
        }
        Ok(workers)
    }

    async fn start_instances(&self, ids: &[String]) -> Result<(), ProviderError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.client
            .start_instances()
            .set_instance_ids(Some(ids.to_vec()))
            .send()
            .await
            .map_err(|e| ProviderError::Api(e.to_string()))?;
        Ok(())
    }

    async fn stop_instances(&self, ids: &[String]) -> Result<(), ProviderError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.client
            .stop_instances()
            .set_instance_ids(Some(ids.to_vec()))
            .send()
            .await
            .map_err(|e| ProviderError::Api(e.to_string()))?;
        Ok(())
    }
}

fn tag_value(tags: &[aws_sdk_ec2::types::Tag], key: &str) -> Option<String> {
    tags.iter()
        .find(|t| t.key() == Some(key))
        .and_then(|t| t.value())
        .map(str::to_string)
}
