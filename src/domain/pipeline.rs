use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::AppError;

/// Stages an upload moves through, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Received,
    Parsed,
    Classified,
    Scored,
    Serialized,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Received => "received",
            PipelineStage::Parsed => "parsed",
            PipelineStage::Classified => "classified",
            PipelineStage::Scored => "scored",
            PipelineStage::Serialized => "serialized",
        };
        f.write_str(name)
    }
}

/// `Failed(stage, reason)`: the last stage reached and why the next step failed
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineError {
    pub stage: PipelineStage,
    pub error: AppError,
}

impl PipelineError {
    pub fn new(stage: PipelineStage, error: AppError) -> Self {
        Self { stage, error }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed after stage '{}': {}", self.stage, self.error)
    }
}

impl std::error::Error for PipelineError {}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        err.error
    }
}
