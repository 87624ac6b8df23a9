//! Pipeline run orchestration.
//!
//! One run = stage inputs into a scoped workspace, drive the engine child
//! process while streaming its progress into the durable progress record,
//! then materialize the engine's output back into result rows. The
//! workspace and the child are released on every exit path, including
//! cooperative abort.

pub mod continuation;
pub mod error;
pub mod executor;
pub mod materialize;
pub mod staging;
pub mod storage;

pub use continuation::JobQueue;
pub use error::PipelineError;
pub use executor::{run_pipeline, RunOutcome};
pub use storage::{BlobStore, LocalBlobStore, S3BlobStore};
