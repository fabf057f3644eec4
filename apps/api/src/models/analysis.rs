use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which analysis the model is asked to perform. Selects the prompt template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    FullAnalysis,
    SkillsGap,
    MatchScore,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 3] = [
        AnalysisKind::FullAnalysis,
        AnalysisKind::SkillsGap,
        AnalysisKind::MatchScore,
    ];

    /// Wire name, as accepted in the `kind` form field.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::FullAnalysis => "full_analysis",
            AnalysisKind::SkillsGap => "skills_gap",
            AnalysisKind::MatchScore => "match_score",
        }
    }

    /// Human-facing label shown by the host UI.
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisKind::FullAnalysis => "Complete Resume Analysis",
            AnalysisKind::SkillsGap => "Skills Improvement Plan",
            AnalysisKind::MatchScore => "ATS Match Score",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        AnalysisKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                format!("unknown analysis kind '{wanted}' (expected full_analysis, skills_gap or match_score)")
            })
    }
}

/// One analysis job as handed to the pipeline.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub resume: Bytes,
    pub job_description: String,
    pub kind: AnalysisKind,
}

/// Successful pipeline output. `text` is the model response, untouched.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub analysis_id: Uuid,
    pub kind: AnalysisKind,
    pub job_field: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Entry of `GET /api/v1/analyses/kinds`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisKindInfo {
    pub kind: AnalysisKind,
    pub label: &'static str,
}
