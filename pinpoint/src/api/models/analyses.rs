//! API models for photo analysis requests.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::analysis::AnalysisOutcome;
use crate::gate::Settlement;

/// How an analysis attempt concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// A report was produced.
    Report,
    /// The upload was not a usable photo; nothing was charged.
    NoEvidence,
    /// The analysis was attempted but the backend failed.
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResponse {
    pub status: AnalysisStatus,
    /// The forensic report, present when status is `report`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    /// Human-readable explanation for non-report outcomes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Whether this attempt was charged (credit, plan allowance or trial)
    pub usage_recorded: bool,
    /// Populated when settlement could not be completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl AnalysisResponse {
    pub fn from_outcome(outcome: AnalysisOutcome, settlement: Option<Settlement>) -> Self {
        let usage_recorded = settlement.as_ref().is_some_and(Settlement::recorded);
        match outcome {
            AnalysisOutcome::Report(report) => Self {
                status: AnalysisStatus::Report,
                report: Some(report),
                detail: None,
                usage_recorded,
                warning: None,
            },
            AnalysisOutcome::NoEvidence => Self {
                status: AnalysisStatus::NoEvidence,
                report: None,
                detail: Some("The uploaded file could not be read as a photo. Nothing was charged.".to_string()),
                usage_recorded,
                warning: None,
            },
            AnalysisOutcome::Failed(detail) => Self {
                status: AnalysisStatus::Failed,
                report: None,
                detail: Some(detail),
                usage_recorded,
                warning: None,
            },
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }
}
