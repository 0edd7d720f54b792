// Verdict Classification
// Maps a validated result onto the three UI states and the gauge band.

use serde::Serialize;

use super::language::contains_georgian;
use crate::models::DetectionResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Inconclusive,
    Human,
    Ai,
}

impl Verdict {
    pub fn of(result: &DetectionResult) -> Self {
        match result.is_ai_generated {
            None => Verdict::Inconclusive,
            Some(false) => Verdict::Human,
            Some(true) => Verdict::Ai,
        }
    }

    pub fn headline(&self) -> &'static str {
        match self {
            Verdict::Inconclusive => "Result Inconclusive",
            Verdict::Human => "Likely Human-Written",
            Verdict::Ai => "AI Presence Detected",
        }
    }
}

/// Colour band of the probability gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbabilityBand {
    Low,
    Moderate,
    Elevated,
    High,
}

impl ProbabilityBand {
    pub fn of(percent: f64) -> Self {
        if percent < 20.0 {
            ProbabilityBand::Low
        } else if percent < 50.0 {
            ProbabilityBand::Moderate
        } else if percent < 80.0 {
            ProbabilityBand::Elevated
        } else {
            ProbabilityBand::High
        }
    }
}

/// Presentation hints derived from a result. Inconclusive results have no
/// gauge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultView {
    pub verdict: Verdict,
    pub headline: &'static str,
    pub display_percent: Option<u32>,
    pub band: Option<ProbabilityBand>,
    /// Georgian summaries are rendered upright rather than in italics.
    pub summary_is_georgian: bool,
}

impl ResultView {
    pub fn of(result: &DetectionResult) -> Self {
        let verdict = Verdict::of(result);
        let percent = match verdict {
            Verdict::Inconclusive => None,
            _ => result.ai_probability_percent,
        };
        Self {
            verdict,
            headline: verdict.headline(),
            display_percent: percent.map(|p| p.clamp(0.0, 100.0).round() as u32),
            band: percent.map(ProbabilityBand::of),
            summary_is_georgian: contains_georgian(&result.analysis_summary),
        }
    }
}
