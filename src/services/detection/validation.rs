// Response Validation
// Strict parsing of the provider payload into a DetectionResult

use serde::{Deserialize, Deserializer};
use tracing::warn;

use super::analyzer::AnalysisError;
use super::language::check_summary_script;
use crate::models::{ConfidenceLevel, DetectionResult};
use crate::services::config_store::{DetectionConfig, ProbabilityPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseRules {
    pub probability_policy: ProbabilityPolicy,
    pub enforce_summary_script: bool,
}

impl Default for ResponseRules {
    fn default() -> Self {
        Self {
            probability_policy: ProbabilityPolicy::Reject,
            enforce_summary_script: true,
        }
    }
}

impl From<&DetectionConfig> for ResponseRules {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            probability_policy: config.probability_policy,
            enforce_summary_script: config.enforce_summary_script,
        }
    }
}

/// Distinguishes an explicit `null` (`Some(None)`) from a missing key (`None`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
struct WirePayload {
    #[serde(default, deserialize_with = "present")]
    is_ai_generated: Option<Option<bool>>,
    #[serde(default, deserialize_with = "present")]
    ai_probability_percent: Option<Option<f64>>,
    confidence_level: String,
    detected_language: String,
    analysis_summary: String,
}

fn malformed(msg: impl Into<String>) -> AnalysisError {
    AnalysisError::MalformedResponse(msg.into())
}

fn violation(msg: impl Into<String>) -> AnalysisError {
    AnalysisError::SchemaViolation(msg.into())
}

/// Parse and validate a raw provider payload. Pure: the same input always
/// yields the same output.
pub fn parse_detection_result(raw: &str, rules: &ResponseRules) -> Result<DetectionResult, AnalysisError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(malformed("empty response body"));
    }

    let wire: WirePayload = serde_json::from_str(raw).map_err(|e| malformed(e.to_string()))?;

    let is_ai_generated = wire
        .is_ai_generated
        .ok_or_else(|| malformed("missing field `is_ai_generated`"))?;
    let ai_probability_percent = wire
        .ai_probability_percent
        .ok_or_else(|| malformed("missing field `ai_probability_percent`"))?;

    let confidence_level = ConfidenceLevel::parse(&wire.confidence_level).ok_or_else(|| {
        violation(format!("unknown confidence_level {:?}", wire.confidence_level))
    })?;

    let ai_probability_percent = match (is_ai_generated, ai_probability_percent) {
        (None, None) => None,
        (Some(_), Some(p)) => Some(check_probability(p, rules.probability_policy)?),
        (None, Some(_)) => {
            return Err(violation("ai_probability_percent is set but is_ai_generated is null"));
        }
        (Some(_), None) => {
            return Err(violation("is_ai_generated is set but ai_probability_percent is null"));
        }
    };

    if is_ai_generated.is_none() && confidence_level != ConfidenceLevel::Low {
        return Err(violation(format!(
            "inconclusive result must have low confidence, got {}",
            confidence_level
        )));
    }

    if wire.detected_language.trim().is_empty() {
        return Err(violation("detected_language is empty"));
    }
    if wire.analysis_summary.trim().is_empty() {
        return Err(violation("analysis_summary is empty"));
    }

    if rules.enforce_summary_script {
        check_summary_script(&wire.detected_language, &wire.analysis_summary).map_err(violation)?;
    }

    Ok(DetectionResult {
        is_ai_generated,
        ai_probability_percent,
        confidence_level,
        detected_language: wire.detected_language,
        analysis_summary: wire.analysis_summary,
    })
}

fn check_probability(p: f64, policy: ProbabilityPolicy) -> Result<f64, AnalysisError> {
    if !p.is_finite() {
        return Err(violation("ai_probability_percent is not a finite number"));
    }
    if (0.0..=100.0).contains(&p) {
        return Ok(p);
    }
    match policy {
        ProbabilityPolicy::Reject => Err(violation(format!(
            "ai_probability_percent {} outside [0, 100]",
            p
        ))),
        ProbabilityPolicy::Clamp => {
            warn!("[VALIDATION] clamping ai_probability_percent {} into [0, 100]", p);
            Ok(p.clamp(0.0, 100.0))
        }
    }
}
