use crate::error::Result;
use crate::scorer::{self, PracticeScore};
use crate::taxonomy::Taxonomy;
use crate::types::{ComplianceStatus, PracticePhase, Severity};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSummary {
    pub phase: PracticePhase,
    /// Rounded mean of the phase's numeric practice scores, if any.
    pub score: Option<u32>,
    pub practices_scored: usize,
    pub practices_total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub practice_id: String,
    pub score: Option<u32>,
    pub status: ComplianceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_severity: Option<Severity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub overall_score: Option<u32>,
    pub phases: Vec<PhaseSummary>,
    pub gaps: Vec<Gap>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render practice scores into an executive report. Pure transformation:
/// the input scores are read, never mutated.
///
/// Gaps are every practice that is not compliant and not out of scope,
/// worst first: ascending score (unscored last), then descending severity
/// of contributing findings, then practice id.
pub fn render(scores: &[PracticeScore], taxonomy: &Taxonomy) -> Result<Report> {
    let overall_score = scorer::overall(scores, taxonomy)?.map(|s| s.round() as u32);

    let mut phases = Vec::new();
    for phase in [PracticePhase::Planning, PracticePhase::Implementation] {
        let mut in_phase: Vec<&PracticeScore> = Vec::new();
        for s in scores {
            if taxonomy.phase_of(&s.practice_id)? == phase {
                in_phase.push(s);
            }
        }
        let numeric: Vec<f64> = in_phase.iter().filter_map(|s| s.score).map(f64::from).collect();
        let score = if numeric.is_empty() {
            None
        } else {
            Some((numeric.iter().sum::<f64>() / numeric.len() as f64).round() as u32)
        };
        phases.push(PhaseSummary {
            phase,
            score,
            practices_scored: numeric.len(),
            practices_total: in_phase.len(),
        });
    }

    let mut gaps: Vec<Gap> = scores
        .iter()
        .filter(|s| {
            !matches!(
                s.status,
                ComplianceStatus::Compliant | ComplianceStatus::NotApplicable
            )
        })
        .map(|s| Gap {
            practice_id: s.practice_id.clone(),
            score: s.score,
            status: s.status,
            top_severity: scorer::top_severity(s),
        })
        .collect();
    gaps.sort_by(|a, b| {
        a.score
            .unwrap_or(u32::MAX)
            .cmp(&b.score.unwrap_or(u32::MAX))
            .then(severity_rank(a.top_severity).cmp(&severity_rank(b.top_severity)))
            .then(a.practice_id.cmp(&b.practice_id))
    });

    let recommendations = scorer::dedup_normalized(
        scores
            .iter()
            .flat_map(|s| s.recommendations.iter().cloned())
            .collect(),
    );

    Ok(Report {
        overall_score,
        phases,
        gaps,
        recommendations,
    })
}

fn severity_rank(severity: Option<Severity>) -> u8 {
    severity.map(Severity::rank).unwrap_or(u8::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
