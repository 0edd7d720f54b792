// Analysis Client
// One provider call per request: build the call, send it, validate the payload.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

use super::prompt::build_provider_request;
use super::validation::{parse_detection_result, ResponseRules};
use super::verdict::Verdict;
use crate::models::{AnalysisRequest, DetectionResult};
use crate::services::providers::{DetectionProvider, ProviderError};

pub const BUSY_MESSAGE: &str = "Our systems are busy. Please try again in a moment.";

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("transport error: {0}")]
    Transport(#[source] ProviderError),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("schema violation: {0}")]
    SchemaViolation(String),
}

impl AnalysisError {
    /// Generic message shown to the user; internal detail stays in the logs.
    pub fn user_message(&self) -> &'static str {
        BUSY_MESSAGE
    }
}

impl From<ProviderError> for AnalysisError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::JsonError(msg) => AnalysisError::MalformedResponse(msg),
            ProviderError::MissingContent => {
                AnalysisError::MalformedResponse("provider returned no content".to_string())
            }
            other => AnalysisError::Transport(other),
        }
    }
}

/// How a cancellable analysis ended. Cancellation is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Completed(DetectionResult),
    Cancelled,
}

#[derive(Clone)]
pub struct AnalysisClient {
    provider: Arc<dyn DetectionProvider>,
    rules: ResponseRules,
}

impl AnalysisClient {
    pub fn new(provider: Arc<dyn DetectionProvider>) -> Self {
        Self {
            provider,
            rules: ResponseRules::default(),
        }
    }

    pub fn with_rules(mut self, rules: ResponseRules) -> Self {
        self.rules = rules;
        self
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<DetectionResult, AnalysisError> {
        let started = Instant::now();
        let provider_request = build_provider_request(request);

        info!(
            "[ANALYZER] start provider={} input_type={:?} text_chars={} image_bytes={} mime={}",
            self.provider.name(),
            request.input_type(),
            request.text().map(|t| t.chars().count()).unwrap_or(0),
            request.image().map(|i| i.bytes.len()).unwrap_or(0),
            request.image().map(|i| i.mime_type.as_str()).unwrap_or("-"),
        );

        let raw = match self.provider.infer(&provider_request).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    "[ANALYZER] provider call failed after {}ms: {}",
                    started.elapsed().as_millis(),
                    e
                );
                return Err(e.into());
            }
        };

        match parse_detection_result(&raw, &self.rules) {
            Ok(result) => {
                info!(
                    "[ANALYZER] done verdict={:?} probability={:?} confidence={} language={} elapsed_ms={}",
                    Verdict::of(&result),
                    result.ai_probability_percent,
                    result.confidence_level,
                    result.detected_language,
                    started.elapsed().as_millis()
                );
                Ok(result)
            }
            Err(e) => {
                warn!(
                    "[ANALYZER] rejected provider payload ({} chars): {}",
                    raw.chars().count(),
                    e
                );
                Err(e)
            }
        }
    }

    /// Race the analysis against `cancel`. When `cancel` resolves first the
    /// in-flight call is dropped and `Cancelled` is returned.
    pub async fn analyze_cancellable<F>(
        &self,
        request: &AnalysisRequest,
        cancel: F,
    ) -> Result<AnalysisOutcome, AnalysisError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            res = self.analyze(request) => res.map(AnalysisOutcome::Completed),
            _ = cancel => {
                info!("[ANALYZER] cancelled by caller");
                Ok(AnalysisOutcome::Cancelled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfidenceLevel, ImagePayload};
    use crate::services::detection::prompt::OCR_INSTRUCTION;
    use crate::services::providers::{ContentPart, ProviderRequest};
    use crate::services::request_builder::build_request;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    enum Reply {
        Payload(String),
        Api(u16),
        Empty,
        Hang,
    }

    struct MockProvider {
        reply: Reply,
        calls: AtomicUsize,
        last_request: Mutex<Option<ProviderRequest>>,
    }

    impl MockProvider {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }

        fn payload(raw: &str) -> Arc<Self> {
            Self::new(Reply::Payload(raw.to_string()))
        }
    }

    #[async_trait]
    impl DetectionProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn infer(&self, request: &ProviderRequest) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            match &self.reply {
                Reply::Payload(raw) => Ok(raw.clone()),
                Reply::Api(status) => Err(ProviderError::ApiError {
                    status: *status,
                    message: "unavailable".to_string(),
                }),
                Reply::Empty => Err(ProviderError::MissingContent),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(ProviderError::MissingContent)
                }
            }
        }
    }

    const AI_ENGLISH: &str = r#"{"is_ai_generated": true, "ai_probability_percent": 87, "confidence_level": "high", "detected_language": "English", "analysis_summary": "Predictable phrasing and uniform sentences point to AI generation."}"#;

    #[tokio::test]
    async fn test_analyze_ai_english() {
        let provider = MockProvider::payload(AI_ENGLISH);
        let client = AnalysisClient::new(provider.clone());
        let request = build_request(Some("Some reasonably long sample text."), None).unwrap();

        let result = client.analyze(&request).await.unwrap();
        assert_eq!(result.is_ai_generated, Some(true));
        assert_eq!(result.ai_probability_percent, Some(87.0));
        assert_eq!(result.confidence_level, ConfidenceLevel::High);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        let sent = provider.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(
            sent.parts,
            vec![ContentPart::Text(
                "Analyze this text: Some reasonably long sample text.".to_string()
            )]
        );
        assert!(sent.system_instruction.contains("OCR Tasks"));
    }

    #[tokio::test]
    async fn test_image_only_sends_ocr_instruction() {
        let unreadable = r#"{"is_ai_generated": null, "ai_probability_percent": null, "confidence_level": "low", "detected_language": "Unknown", "analysis_summary": "The text in the image could not be reliably read for analysis."}"#;
        let provider = MockProvider::payload(unreadable);
        let client = AnalysisClient::new(provider.clone());
        let request = build_request(None, Some(ImagePayload::new(vec![0xff, 0xd8], "image/jpeg"))).unwrap();

        let result = client.analyze(&request).await.unwrap();
        assert!(result.is_inconclusive());
        assert_eq!(result.ai_probability_percent, None);

        let sent = provider.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(sent.parts.last(), Some(&ContentPart::Text(OCR_INSTRUCTION.to_string())));
    }

    #[tokio::test]
    async fn test_transport_error_not_retried() {
        let provider = MockProvider::new(Reply::Api(503));
        let client = AnalysisClient::new(provider.clone());
        let request = build_request(Some("two words"), None).unwrap();

        let err = client.analyze(&request).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Transport(ProviderError::ApiError { status: 503, .. })));
        assert_eq!(err.user_message(), BUSY_MESSAGE);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_content_is_malformed() {
        let client = AnalysisClient::new(MockProvider::new(Reply::Empty));
        let request = build_request(Some("two words"), None).unwrap();
        assert!(matches!(
            client.analyze(&request).await,
            Err(AnalysisError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_payload_never_partial() {
        let client = AnalysisClient::new(MockProvider::payload(r#"{"is_ai_generated": true, "ai_probability_percent": 5"#));
        let request = build_request(Some("two words"), None).unwrap();
        let err = client.analyze(&request).await.unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
        assert_eq!(err.user_message(), BUSY_MESSAGE);
    }

    #[tokio::test]
    async fn test_cancellation_is_distinct_outcome() {
        let client = AnalysisClient::new(MockProvider::new(Reply::Hang));
        let request = build_request(Some("two words"), None).unwrap();
        let outcome = client
            .analyze_cancellable(&request, tokio::time::sleep(Duration::from_millis(10)))
            .await
            .unwrap();
        assert_eq!(outcome, AnalysisOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_cancellable_completes() {
        let client = AnalysisClient::new(MockProvider::payload(AI_ENGLISH));
        let request = build_request(Some("two words"), None).unwrap();
        let outcome = client
            .analyze_cancellable(&request, std::future::pending())
            .await
            .unwrap();
        assert!(matches!(outcome, AnalysisOutcome::Completed(r) if r.is_ai_generated == Some(true)));
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_independent() {
        let provider = MockProvider::payload(AI_ENGLISH);
        let client = AnalysisClient::new(provider.clone());
        let a = build_request(Some("first request text"), None).unwrap();
        let b = build_request(Some("second request text"), None).unwrap();

        let (ra, rb) = tokio::join!(client.analyze(&a), client.analyze(&b));
        assert_eq!(ra.unwrap(), rb.unwrap());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }
}
