// Inference Provider Service
// The DetectionProvider seam plus the Gemini generateContent implementation

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info};

use super::config_store::{AppConfig, ProviderConfig};

const GEMINI_DEFAULT_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Missing content in response")]
    MissingContent,
    #[error("Response blocked: {0}")]
    Blocked(String),
    #[error("JSON parse error: {0}")]
    JsonError(String),
    #[error("API key not configured")]
    MissingApiKey,
}

/// One piece of user content sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    InlineImage { mime_type: String, data: Vec<u8> },
}

/// Provider-agnostic structured-generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub system_instruction: String,
    pub parts: Vec<ContentPart>,
    pub response_schema: serde_json::Value,
}

/// A remote model that answers a structured-generation request with raw
/// payload text. Implementations perform exactly one outbound call.
#[async_trait]
pub trait DetectionProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn infer(&self, request: &ProviderRequest) -> Result<String, ProviderError>;
}

// ============ Gemini wire format ============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
    status: Option<String>,
}

fn to_gemini_request(request: &ProviderRequest) -> GeminiRequest {
    let parts = request
        .parts
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => GeminiPart::Text { text: text.clone() },
            ContentPart::InlineImage { mime_type, data } => GeminiPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: mime_type.clone(),
                    data: BASE64.encode(data),
                },
            },
        })
        .collect();

    GeminiRequest {
        system_instruction: GeminiContent {
            role: None,
            parts: vec![GeminiPart::Text {
                text: request.system_instruction.clone(),
            }],
        },
        contents: vec![GeminiContent {
            role: Some("user"),
            parts,
        }],
        generation_config: GeminiGenerationConfig {
            response_mime_type: "application/json",
            response_schema: request.response_schema.clone(),
        },
    }
}

/// Pull the generated text out of a successful generateContent body.
/// Multiple text parts are concatenated in order.
fn extract_candidate_text(body: &str) -> Result<String, ProviderError> {
    let data: GeminiResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::JsonError(e.to_string()))?;

    if let Some(err) = data.error {
        return Err(ProviderError::ApiError {
            status: 200,
            message: err.message,
        });
    }

    let text: String = data
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if !text.trim().is_empty() {
        return Ok(text);
    }

    match data.prompt_feedback.and_then(|f| f.block_reason) {
        Some(reason) => Err(ProviderError::Blocked(reason)),
        None => Err(ProviderError::MissingContent),
    }
}

/// Turn a non-success body into a short, key-free message.
fn describe_api_error(status: u16, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<GeminiResponse>(body) {
        if let Some(err) = parsed.error {
            return match err.status.as_deref() {
                Some("INVALID_ARGUMENT") if err.message.contains("API key") => {
                    "Invalid API key".to_string()
                }
                Some("PERMISSION_DENIED") => "Invalid API key".to_string(),
                Some("RESOURCE_EXHAUSTED") => "API quota exceeded".to_string(),
                _ => err.message,
            };
        }
    }
    format!("HTTP {}", status)
}

pub struct GeminiProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiProvider {
    /// Build from a provider config, an optional proxy and a resolved key.
    pub fn from_config(
        config: &ProviderConfig,
        proxy_url: Option<&str>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        if let Some(url) = proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(url)?);
        }
        let client = builder.build()?;

        let base_url = config
            .base_url
            .clone()
            .or_else(|| env::var("GEMINI_API_URL").ok())
            .unwrap_or_else(|| GEMINI_DEFAULT_URL.to_string());

        Ok(Self {
            client,
            base_url,
            model: config.model.clone(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl DetectionProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn infer(&self, request: &ProviderRequest) -> Result<String, ProviderError> {
        let body = to_gemini_request(request);
        let start = Instant::now();

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(
                    "[GEMINI] request failed model={} timeout={} connect={}",
                    self.model,
                    e.is_timeout(),
                    e.is_connect()
                );
                ProviderError::HttpError(e)
            })?;

        let status = response.status();
        let text = response.text().await?;
        let latency_ms = start.elapsed().as_millis();

        if !status.is_success() {
            let message = describe_api_error(status.as_u16(), &text);
            error!(
                "[GEMINI] API error model={} status={} latency_ms={} : {}",
                self.model, status, latency_ms, message
            );
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        debug!("[GEMINI] response body {} bytes", text.len());
        let content = extract_candidate_text(&text)?;
        info!(
            "[GEMINI] ok model={} latency_ms={} payload_chars={}",
            self.model,
            latency_ms,
            content.chars().count()
        );
        Ok(content)
    }
}

const GEMINI_KEY_VARS: [&str; 3] = ["GEMINI_API_KEY", "VERITAS_GEMINI_API_KEY", "API_KEY"];

/// Environment variables first, then the given config.
pub fn resolve_api_key(provider: &str, config: Option<&AppConfig>) -> Option<String> {
    let env_keys: &[&str] = match provider {
        "gemini" => &GEMINI_KEY_VARS,
        _ => &[],
    };

    for key in env_keys {
        if let Ok(val) = env::var(key) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }

    config
        .and_then(|c| c.api_keys.get(provider))
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}
