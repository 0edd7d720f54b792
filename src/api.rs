// Front door for callers (UI shell, CLI)
// build -> analyze -> record, with user-facing error messages

use serde::Serialize;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{AnalysisRequest, DetectionResult, HistoryItem, ImagePayload};
use crate::services::config_store::AppConfig;
use crate::services::detection::{AnalysisClient, AnalysisError, AnalysisOutcome, ResponseRules, ResultView};
use crate::services::history_store::HistoryStore;
use crate::services::local_store::StoreError;
use crate::services::providers::{resolve_api_key, DetectionProvider, GeminiProvider, ProviderError};
use crate::services::request_builder::{build_request_with, InputLimits, ValidationError};

#[derive(Error, Debug)]
pub enum DetectError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl DetectError {
    pub fn user_message(&self) -> String {
        match self {
            DetectError::Validation(e) => e.user_message(),
            DetectError::Analysis(e) => e.user_message().to_string(),
        }
    }
}

/// A successful analysis plus what the caller needs to render and revisit it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionReport {
    pub result: DetectionResult,
    pub view: ResultView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
}

pub struct DetectionService {
    client: AnalysisClient,
    limits: InputLimits,
    history: Option<HistoryStore>,
}

impl DetectionService {
    pub fn new(client: AnalysisClient, limits: InputLimits, history: Option<HistoryStore>) -> Self {
        Self { client, limits, history }
    }

    /// Wire a Gemini-backed service from the app config.
    pub fn from_config(config: &AppConfig, history: Option<HistoryStore>) -> Result<Self, ProviderError> {
        let api_key = resolve_api_key("gemini", Some(config)).ok_or(ProviderError::MissingApiKey)?;
        let proxy = config.proxy.as_ref().and_then(|p| p.active_url());
        let provider: Arc<dyn DetectionProvider> =
            Arc::new(GeminiProvider::from_config(&config.provider, proxy, api_key)?);

        let client = AnalysisClient::new(provider).with_rules(ResponseRules::from(&config.detection));
        Ok(Self::new(client, InputLimits::from(&config.detection), history))
    }

    pub async fn detect(
        &self,
        text: Option<&str>,
        image: Option<ImagePayload>,
    ) -> Result<DetectionReport, DetectError> {
        let request = self.build(text, image)?;
        let result = self.client.analyze(&request).await?;
        Ok(self.finish(&request, result))
    }

    /// `Ok(None)` when `cancel` fired before the provider answered.
    pub async fn detect_cancellable<F>(
        &self,
        text: Option<&str>,
        image: Option<ImagePayload>,
        cancel: F,
    ) -> Result<Option<DetectionReport>, DetectError>
    where
        F: Future<Output = ()>,
    {
        let request = self.build(text, image)?;
        match self.client.analyze_cancellable(&request, cancel).await? {
            AnalysisOutcome::Completed(result) => Ok(Some(self.finish(&request, result))),
            AnalysisOutcome::Cancelled => Ok(None),
        }
    }

    fn build(&self, text: Option<&str>, image: Option<ImagePayload>) -> Result<AnalysisRequest, ValidationError> {
        build_request_with(self.limits, text, image).map_err(|e| {
            info!("[API] input rejected: {}", e);
            e
        })
    }

    fn finish(&self, request: &AnalysisRequest, result: DetectionResult) -> DetectionReport {
        // History is best effort; a storage failure never hides the verdict.
        let history_id = match &self.history {
            Some(history) => match history.record(&result, request) {
                Ok(item) => Some(item.id),
                Err(e) => {
                    warn!("[API] failed to record history: {}", e);
                    None
                }
            },
            None => None,
        };

        DetectionReport {
            view: ResultView::of(&result),
            result,
            history_id,
        }
    }

    pub fn history(&self) -> Option<&HistoryStore> {
        self.history.as_ref()
    }

    /// Re-open a past result for display.
    pub fn view_history_item(&self, id: &str) -> Result<Option<(HistoryItem, ResultView)>, StoreError> {
        let Some(history) = &self.history else {
            return Ok(None);
        };
        Ok(history.get(id)?.map(|item| {
            let view = ResultView::of(&item.result);
            (item, view)
        }))
    }
}

/// MIME type from a file extension; `None` for anything that is not a
/// recognised image.
pub fn guess_image_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// Read an image from disk. Unknown extensions get `application/octet-stream`
/// so the request builder rejects them with the usual guidance.
pub fn load_image(path: &Path, mime_override: Option<&str>) -> Result<ImagePayload, StoreError> {
    let bytes = std::fs::read(path).map_err(StoreError::io(path))?;
    let mime_type = mime_override
        .map(str::to_string)
        .or_else(|| guess_image_mime(path).map(str::to_string))
        .unwrap_or_else(|| "application/octet-stream".to_string());
    Ok(ImagePayload::new(bytes, mime_type))
}
