//! HTTP client for the Gemini `generateContent` endpoint

use crate::TrackiflyError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// One generation call: a prompt plus optional output constraints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub system_instruction: Option<String>,
    pub response_mime_type: Option<String>,
    /// Schema the response must satisfy. Only honoured with a JSON MIME type.
    pub response_schema: Option<Value>,
}

impl GenerateRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn json(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response_mime_type: Some("application/json".to_string()),
            ..Default::default()
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

/// Abstraction over text generation backends.
///
/// Returns the raw text of the first candidate. An empty candidate is an
/// error ([`TrackiflyError::EmptyResponse`]), never an empty string.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<String, TrackiflyError>;

    /// Stable label for logging.
    fn name(&self) -> &str;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateContentBody {
    fn from_request(request: GenerateRequest) -> Self {
        let generation_config = if request.response_mime_type.is_some()
            || request.response_schema.is_some()
        {
            Some(GenerationConfig {
                response_mime_type: request.response_mime_type,
                response_schema: request.response_schema,
            })
        } else {
            None
        };

        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(request.prompt),
                }],
            }],
            system_instruction: request.system_instruction.map(|text| Content {
                role: None,
                parts: vec![Part { text: Some(text) }],
            }),
            generation_config,
        }
    }
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Gemini REST client
#[derive(Clone)]
pub struct GeminiClient {
    http_client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiClient {
    /// Create a new client for the default model and endpoint
    pub fn new(api_key: impl Into<String>) -> Result<Self, TrackiflyError> {
        Self::with_endpoint(api_key, DEFAULT_MODEL, DEFAULT_BASE_URL)
    }

    pub fn with_endpoint(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, TrackiflyError> {
        debug!("Creating new Gemini client");
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    #[instrument(level = "info", skip(self, request), fields(model = %self.model))]
    async fn generate(&self, request: GenerateRequest) -> Result<String, TrackiflyError> {
        let structured = request.response_schema.is_some();
        let body = GenerateContentBody::from_request(request);
        info!(structured, "Sending generateContent request");

        let start_time = std::time::Instant::now();
        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        info!(
            status = %status,
            duration_ms = start_time.elapsed().as_millis(),
            "generateContent request completed"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "generateContent request failed");
            return Err(TrackiflyError::StatusError {
                service: "gemini",
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let text = parsed.text().ok_or(TrackiflyError::EmptyResponse)?;
        debug!(text_length = text.len(), "Received model text");
        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Stand-in used when no API key is configured; every call fails, so callers
/// fall through to their fallback values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

#[async_trait]
impl GenerativeModel for Unconfigured {
    async fn generate(&self, _request: GenerateRequest) -> Result<String, TrackiflyError> {
        Err(TrackiflyError::MissingConfig("API_KEY"))
    }

    fn name(&self) -> &str {
        "unconfigured"
    }
}
