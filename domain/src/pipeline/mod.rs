//! Question pipeline stages

use serde::{Deserialize, Serialize};

/// Stage of one question's pipeline
///
/// `Pending → Researching → Predicting → Aggregating → {Done | Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Pending,
    Researching,
    Predicting,
    Aggregating,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Pending => "pending",
            PipelineStage::Researching => "researching",
            PipelineStage::Predicting => "predicting",
            PipelineStage::Aggregating => "aggregating",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PipelineStage::Pending => "Pending",
            PipelineStage::Researching => "Research",
            PipelineStage::Predicting => "Prediction",
            PipelineStage::Aggregating => "Aggregation",
            PipelineStage::Done => "Done",
            PipelineStage::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }

    /// Whether `next` is a legal transition from this stage
    pub fn can_transition_to(&self, next: PipelineStage) -> bool {
        use PipelineStage::*;
        matches!(
            (self, next),
            (Pending, Researching)
                | (Researching, Predicting)
                | (Predicting, Aggregating)
                | (Aggregating, Done)
                | (Pending | Researching | Predicting | Aggregating, Failed)
        )
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
