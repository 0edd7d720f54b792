// Detection Policy
// Fixed system instruction, degenerate-response templates and the output schema
// sent with every analysis call.

use serde_json::{json, Value};
use std::sync::OnceLock;

use crate::models::{AnalysisRequest, ConfidenceLevel, DetectionResult};
use crate::services::providers::{ContentPart, ProviderRequest};

pub const OCR_INSTRUCTION: &str =
    "Perform OCR on this image and then analyze if the extracted text is AI-generated.";

pub const RESULT_FIELDS: [&str; 5] = [
    "is_ai_generated",
    "ai_probability_percent",
    "confidence_level",
    "detected_language",
    "analysis_summary",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    UnreadableImage,
    TextTooShort,
}

/// A canned inconclusive answer the provider is told to return verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureTemplate {
    pub kind: FailureKind,
    pub georgian: bool,
    pub detected_language: &'static str,
    pub summary: &'static str,
}

impl FailureTemplate {
    pub fn result(&self) -> DetectionResult {
        DetectionResult {
            is_ai_generated: None,
            ai_probability_percent: None,
            confidence_level: ConfidenceLevel::Low,
            detected_language: self.detected_language.to_string(),
            analysis_summary: self.summary.to_string(),
        }
    }

    /// Compact JSON in schema field order.
    pub fn to_json(&self) -> String {
        // A struct of strings and options always serializes.
        serde_json::to_string(&self.result()).unwrap_or_default()
    }

    fn label(&self) -> &'static str {
        match (self.kind, self.georgian) {
            (FailureKind::UnreadableImage, false) => "Low-quality image (English)",
            (FailureKind::UnreadableImage, true) => "Low-quality image (Georgian)",
            (FailureKind::TextTooShort, true) => "Short text (Georgian)",
            (FailureKind::TextTooShort, false) => "Short text (English)",
        }
    }
}

pub const FAILURE_TEMPLATES: [FailureTemplate; 4] = [
    FailureTemplate {
        kind: FailureKind::UnreadableImage,
        georgian: false,
        detected_language: "Unknown",
        summary: "The text in the image could not be reliably read for analysis.",
    },
    FailureTemplate {
        kind: FailureKind::UnreadableImage,
        georgian: true,
        detected_language: "ქართული",
        summary: "მოცემული სურათიდან ტექსტის წაკითხვა საიმედო ანალიზისთვის ვერ მოხერხდა.",
    },
    FailureTemplate {
        kind: FailureKind::TextTooShort,
        georgian: true,
        detected_language: "Georgian",
        summary: "მოცემული ტექსტი ძალიან მოკლეა საიმედო ანალიზისთვის.",
    },
    FailureTemplate {
        kind: FailureKind::TextTooShort,
        georgian: false,
        detected_language: "English",
        summary: "The provided text is too short to determine whether it was AI-generated.",
    },
];

pub fn failure_template(kind: FailureKind, georgian: bool) -> &'static FailureTemplate {
    FAILURE_TEMPLATES
        .iter()
        .find(|t| t.kind == kind && t.georgian == georgian)
        .unwrap_or(&FAILURE_TEMPLATES[0])
}

const POLICY_HEAD: &str = r#"You are an advanced AI Text Detection Engine with integrated OCR (Optical Character Recognition) capabilities.

OCR Tasks:
1. If an image is provided, extract all readable text (handwritten, printed, or screenshots).
2. Ignore backgrounds and non-text visual elements.
3. Preserve the original language of the extracted text.
4. If text cannot be reliably read due to low quality, blur, or missing content, return the specific failure JSON.

Detection Criteria:
- Linguistic predictability, sentence structure uniformity, vocabulary entropy.
- Stylistic consistency, over-polished tone, and LLM-typical probability distributions.
- Human-like irregularities and natural imperfections.

Language & Response Rules:
- Support English, Georgian (ქართული), and others.
- Identify the primary language of the input (or extracted) text.
- If the text is primarily Georgian, "analysis_summary" MUST be in modern, simple Georgian.
- If the text is NOT Georgian, "analysis_summary" MUST be in English.
- NEVER mix Georgian and English in the "analysis_summary".

Failure Scenarios (JSON Output):
"#;

const POLICY_TAIL: &str = r#"
Final Output:
Always return a strict JSON object following the schema."#;

/// The detection policy attached to every call.
pub fn system_instruction() -> &'static str {
    static INSTRUCTION: OnceLock<String> = OnceLock::new();
    INSTRUCTION.get_or_init(|| {
        let mut out = String::from(POLICY_HEAD);
        for template in FAILURE_TEMPLATES.iter() {
            out.push_str(&format!("- {}: {}\n", template.label(), template.to_json()));
        }
        out.push_str(POLICY_TAIL);
        out
    })
}

/// Output schema: five required fields, two of them nullable.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "is_ai_generated": { "type": "BOOLEAN", "nullable": true },
            "ai_probability_percent": { "type": "NUMBER", "nullable": true },
            "confidence_level": { "type": "STRING", "enum": ["low", "medium", "high"] },
            "detected_language": { "type": "STRING" },
            "analysis_summary": { "type": "STRING" }
        },
        "required": RESULT_FIELDS,
        "propertyOrdering": RESULT_FIELDS,
    })
}

pub fn text_instruction(text: &str) -> String {
    format!("Analyze this text: {}", text)
}

/// Content parts in order: text instruction, inline image, OCR instruction
/// (only for image-only input).
pub fn build_provider_request(request: &AnalysisRequest) -> ProviderRequest {
    let mut parts = Vec::with_capacity(3);

    if let Some(text) = request.text() {
        parts.push(ContentPart::Text(text_instruction(text)));
    }
    if let Some(image) = request.image() {
        parts.push(ContentPart::InlineImage {
            mime_type: image.mime_type.clone(),
            data: image.bytes.clone(),
        });
        if request.text().is_none() {
            parts.push(ContentPart::Text(OCR_INSTRUCTION.to_string()));
        }
    }

    ProviderRequest {
        system_instruction: system_instruction().to_string(),
        parts,
        response_schema: response_schema(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImagePayload;
    use crate::services::request_builder::build_request;

    #[test]
    fn test_template_json_matches_fixture() {
        let tpl = failure_template(FailureKind::UnreadableImage, false);
        assert_eq!(
            tpl.to_json(),
            r#"{"is_ai_generated":null,"ai_probability_percent":null,"confidence_level":"low","detected_language":"Unknown","analysis_summary":"The text in the image could not be reliably read for analysis."}"#
        );
    }

    #[test]
    fn test_templates_cover_each_combination() {
        for kind in [FailureKind::UnreadableImage, FailureKind::TextTooShort] {
            for georgian in [false, true] {
                let tpl = failure_template(kind, georgian);
                assert_eq!(tpl.kind, kind);
                assert_eq!(tpl.georgian, georgian);
            }
        }
    }

    #[test]
    fn test_system_instruction_embeds_templates() {
        let instruction = system_instruction();
        for tpl in FAILURE_TEMPLATES.iter() {
            assert!(instruction.contains(tpl.summary));
        }
        assert!(instruction.contains("NEVER mix Georgian and English"));
        assert!(instruction.ends_with("following the schema."));
    }

    #[test]
    fn test_schema_requires_all_fields() {
        let schema = response_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, RESULT_FIELDS);
        assert_eq!(schema["properties"]["is_ai_generated"]["nullable"], true);
        assert_eq!(schema["properties"]["ai_probability_percent"]["nullable"], true);
        assert!(schema["properties"]["confidence_level"].get("nullable").is_none());
    }

    #[test]
    fn test_text_only_parts() {
        let req = build_request(Some("two words"), None).unwrap();
        let provider_req = build_provider_request(&req);
        assert_eq!(
            provider_req.parts,
            vec![ContentPart::Text("Analyze this text: two words".to_string())]
        );
    }

    #[test]
    fn test_image_only_parts_add_ocr_instruction() {
        let req = build_request(None, Some(ImagePayload::new(vec![1, 2], "image/jpeg"))).unwrap();
        let parts = build_provider_request(&req).parts;
        assert_eq!(parts.len(), 2);
        assert!(matches!(&parts[0], ContentPart::InlineImage { mime_type, .. } if mime_type == "image/jpeg"));
        assert_eq!(parts[1], ContentPart::Text(OCR_INSTRUCTION.to_string()));
    }

    #[test]
    fn test_text_and_image_parts() {
        let req = build_request(Some("caption"), Some(ImagePayload::new(vec![9], "image/png"))).unwrap();
        let parts = build_provider_request(&req).parts;
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], ContentPart::Text("Analyze this text: caption".to_string()));
        assert!(matches!(&parts[1], ContentPart::InlineImage { data, .. } if data == &[9u8]));
    }
}
