//! The fixed set of pipeline kinds and their per-kind wiring.
//!
//! Every kind maps to one engine subcommand, one section of the project
//! definition document, and one work queue. Kinds with a defined successor
//! chain into it on successful completion.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Name of the queue all engine jobs are published to. GPU instances are
/// the only workers that consume it.
pub const GPU_QUEUE: &str = "gpu";

/// One of the fixed computational stages a job can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    Groom,
    Optimize,
    Analyze,
    DeepssmAugment,
    DeepssmTrain,
    DeepssmTest,
}

impl PipelineKind {
    /// All kinds, in trigger-menu order.
    pub const ALL: [PipelineKind; 6] = [
        PipelineKind::Groom,
        PipelineKind::Optimize,
        PipelineKind::Analyze,
        PipelineKind::DeepssmAugment,
        PipelineKind::DeepssmTrain,
        PipelineKind::DeepssmTest,
    ];

    /// Stable string form used in the database, URLs, and queue payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineKind::Groom => "groom",
            PipelineKind::Optimize => "optimize",
            PipelineKind::Analyze => "analyze",
            PipelineKind::DeepssmAugment => "deepssm_augment",
            PipelineKind::DeepssmTrain => "deepssm_train",
            PipelineKind::DeepssmTest => "deepssm_test",
        }
    }

    /// Subcommand passed to the engine binary.
    pub fn engine_subcommand(self) -> &'static str {
        self.as_str()
    }

    /// Section of the project definition document this kind reads and
    /// writes its parameters under. All DeepSSM stages share one section.
    pub fn project_section(self) -> &'static str {
        match self {
            PipelineKind::Groom => "groom",
            PipelineKind::Optimize => "optimize",
            PipelineKind::Analyze => "analysis",
            PipelineKind::DeepssmAugment
            | PipelineKind::DeepssmTrain
            | PipelineKind::DeepssmTest => "deepssm",
        }
    }

    /// Whether the engine emits a separate JSON result manifest instead of
    /// rewriting the project definition in place.
    pub fn writes_manifest(self) -> bool {
        matches!(self, PipelineKind::Analyze)
    }

    /// Queue this kind's jobs are published to.
    pub fn queue(self) -> &'static str {
        GPU_QUEUE
    }

    /// Kind automatically enqueued after this one completes, if any.
    ///
    /// The successor runs with default arguments and its outcome is
    /// recorded independently of this kind's terminal status.
    pub fn successor(self) -> Option<PipelineKind> {
        match self {
            PipelineKind::Optimize => Some(PipelineKind::Analyze),
            _ => None,
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "groom" => Ok(PipelineKind::Groom),
            "optimize" => Ok(PipelineKind::Optimize),
            "analyze" => Ok(PipelineKind::Analyze),
            "deepssm_augment" => Ok(PipelineKind::DeepssmAugment),
            "deepssm_train" => Ok(PipelineKind::DeepssmTrain),
            "deepssm_test" => Ok(PipelineKind::DeepssmTest),
            other => Err(CoreError::Validation(format!(
                "Unknown pipeline kind: \"{other}\""
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
