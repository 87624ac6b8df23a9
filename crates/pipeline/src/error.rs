//! Run failure taxonomy.
//!
//! Four terminal classes: bad request parameters (caught before a run
//! starts), engine failures (stderr or exit status, recorded on the
//! progress record), user aborts (record deleted, no error surfaced), and
//! infrastructure failures (database, storage, broker).

use shapecloud_core::error::CoreError;
use shapecloud_engine::{EngineError, ManifestError};

use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Bad parameters or references, surfaced synchronously.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The engine failed; the message is what gets recorded on the
    /// progress record.
    #[error("{0}")]
    Engine(String),

    /// The abort flag was observed; the run stops without writes.
    #[error("Run aborted")]
    Aborted,

    /// Database, storage, or broker trouble unrelated to the request.
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl From<CoreError> for PipelineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => PipelineError::Validation(msg),
            CoreError::NotFound { entity, id } => {
                PipelineError::Validation(format!("{entity} with id {id} not found"))
            }
            CoreError::Internal(msg) => PipelineError::Infrastructure(msg),
        }
    }
}

impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        PipelineError::Infrastructure(format!("database error: {err}"))
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Infrastructure(format!("I/O error: {err}"))
    }
}

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        PipelineError::Infrastructure(format!("blob store error: {err}"))
    }
}

impl From<EngineError> for PipelineError {
    fn from(err: EngineError) -> Self {
        match err {
            // The engine's own words go onto the progress record verbatim.
            EngineError::Stderr(text) => PipelineError::Engine(text),
            EngineError::Exit { code } => {
                PipelineError::Engine(format!("Engine exited with status {code}"))
            }
            EngineError::Io(e) => {
                PipelineError::Infrastructure(format!("engine process error: {e}"))
            }
        }
    }
}

impl From<ManifestError> for PipelineError {
    fn from(err: ManifestError) -> Self {
        PipelineError::Engine(format!("Unreadable result manifest: {err}"))
    }
}
