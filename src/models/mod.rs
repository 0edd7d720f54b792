// Veritas Data Models
// Shapes exchanged between the request builder, the analysis client and callers

use serde::{Deserialize, Serialize};
use std::fmt;

// ============ Detection Result ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Case-insensitive parse of the provider vocabulary.
    pub fn parse(val: &str) -> Option<Self> {
        match val.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The verdict returned for one analysis.
///
/// `is_ai_generated` and `ai_probability_percent` are either both present or
/// both null; the null pair means the input could not be judged (too short or
/// unreadable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub is_ai_generated: Option<bool>,
    pub ai_probability_percent: Option<f64>,
    pub confidence_level: ConfidenceLevel,
    pub detected_language: String,
    pub analysis_summary: String,
}

impl DetectionResult {
    pub fn is_inconclusive(&self) -> bool {
        self.is_ai_generated.is_none()
    }
}

// ============ Analysis Request ============

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }
}

/// A validated request. Only `request_builder::build_request` constructs one,
/// so at least one of text or image is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub(crate) text: Option<String>,
    pub(crate) image: Option<ImagePayload>,
}

impl AnalysisRequest {
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn image(&self) -> Option<&ImagePayload> {
        self.image.as_ref()
    }

    pub fn input_type(&self) -> InputType {
        if self.image.is_some() {
            InputType::Image
        } else {
            InputType::Text
        }
    }
}

// ============ History ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Text,
    Image,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub result: DetectionResult,
    pub input_snippet: String,
    pub input_type: InputType,
}

// ============ Session & Preferences ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn parse(val: &str) -> Option<Self> {
        match val.trim().to_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_parse() {
        assert_eq!(ConfidenceLevel::parse("High"), Some(ConfidenceLevel::High));
        assert_eq!(ConfidenceLevel::parse(" low "), Some(ConfidenceLevel::Low));
        assert_eq!(ConfidenceLevel::parse("certain"), None);
    }

    #[test]
    fn test_result_serializes_nulls() {
        let result = DetectionResult {
            is_ai_generated: None,
            ai_probability_percent: None,
            confidence_level: ConfidenceLevel::Low,
            detected_language: "Unknown".to_string(),
            analysis_summary: "unreadable".to_string(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["is_ai_generated"].is_null());
        assert!(json["ai_probability_percent"].is_null());
        assert_eq!(json["confidence_level"], "low");
    }

    #[test]
    fn test_history_item_uses_camel_case() {
        let item = HistoryItem {
            id: "a".to_string(),
            timestamp: 1,
            result: DetectionResult {
                is_ai_generated: Some(false),
                ai_probability_percent: Some(12.0),
                confidence_level: ConfidenceLevel::Medium,
                detected_language: "English".to_string(),
                analysis_summary: "Reads as human.".to_string(),
            },
            input_snippet: "hello there".to_string(),
            input_type: InputType::Text,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["inputSnippet"], "hello there");
        assert_eq!(json["inputType"], "text");
        assert_eq!(json["result"]["detected_language"], "English");
    }
}
