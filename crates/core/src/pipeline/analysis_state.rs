use std::fmt;

use serde::Serialize;

/// Lifecycle of one clip analysis.
///
/// `Failed` is reachable from every non-terminal state; `Done` and `Failed`
/// are terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisState {
    #[default]
    Ingested,
    FramesDecoded,
    PerFrameProcessed,
    Aggregated,
    Done,
    Failed,
}

impl AnalysisState {
    pub fn is_terminal(self) -> bool {
        matches!(self, AnalysisState::Done | AnalysisState::Failed)
    }

    /// Whether `self -> next` is a legal step.
    pub fn can_advance_to(self, next: AnalysisState) -> bool {
        use AnalysisState::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Ingested, FramesDecoded)
            | (FramesDecoded, PerFrameProcessed)
            | (PerFrameProcessed, Aggregated)
            | (Aggregated, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for AnalysisState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisState::Ingested => "INGESTED",
            AnalysisState::FramesDecoded => "FRAMES_DECODED",
            AnalysisState::PerFrameProcessed => "PER_FRAME_PROCESSED",
            AnalysisState::Aggregated => "AGGREGATED",
            AnalysisState::Done => "DONE",
            AnalysisState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}
