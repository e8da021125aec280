//! Google Gemini provider over the `generateContent` REST API.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::llm::provider::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};

const PROVIDER: &str = "gemini";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: SecretString,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

// ── Wire types ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [TextPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    candidate_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
    #[serde(default)]
    safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
    #[serde(default)]
    safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Deserialize)]
struct SafetyRating {
    category: String,
    probability: String,
}

impl SafetyRating {
    fn render(&self) -> String {
        format!("{}={}", self.category, self.probability)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn build_request(request: &CompletionRequest) -> GenerateRequest<'_> {
    let config = GenerationConfig {
        candidate_count: request.candidate_count,
        max_output_tokens: request.max_tokens,
        temperature: request.temperature,
    };
    let has_config = config.candidate_count.is_some()
        || config.max_output_tokens.is_some()
        || config.temperature.is_some();

    GenerateRequest {
        contents: [Content {
            role: "user",
            parts: [TextPart {
                text: &request.prompt,
            }],
        }],
        generation_config: has_config.then_some(config),
    }
}

/// Map a `generateContent` body to a [`CompletionResponse`].
///
/// A prompt block reason wins over any candidate; a `SAFETY` finish on the
/// first candidate also counts as blocked.
fn parse_generate_response(body: &str) -> Result<CompletionResponse, LlmError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: format!("failed to parse response: {e}"),
        })?;

    let usage = parsed.usage_metadata.unwrap_or_default();

    if let Some(PromptFeedback {
        block_reason: Some(reason),
        safety_ratings,
    }) = parsed.prompt_feedback
    {
        return Ok(CompletionResponse {
            content: String::new(),
            finish_reason: FinishReason::Blocked {
                reason,
                ratings: safety_ratings.iter().map(SafetyRating::render).collect(),
            },
            input_tokens: usage.prompt_token_count,
            output_tokens: 0,
        });
    }

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        return Ok(CompletionResponse {
            content: String::new(),
            finish_reason: FinishReason::Other("no candidates".to_string()),
            input_tokens: usage.prompt_token_count,
            output_tokens: 0,
        });
    };

    let content: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    let finish_reason = match candidate.finish_reason.as_deref() {
        None | Some("STOP") => FinishReason::Stop,
        Some("MAX_TOKENS") => FinishReason::Length,
        Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT")) => {
            FinishReason::Blocked {
                reason: reason.to_string(),
                ratings: candidate.safety_ratings.iter().map(SafetyRating::render).collect(),
            }
        }
        Some(other) => FinishReason::Other(other.to_string()),
    };

    Ok(CompletionResponse {
        content,
        finish_reason,
        input_tokens: usage.prompt_token_count,
        output_tokens: usage.candidates_token_count,
    })
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(
            provider = PROVIDER,
            model = %self.model,
            prompt_chars = request.prompt.chars().count(),
            "Sending generateContent request"
        );

        let response = self
            .http
            .post(self.generate_url())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&build_request(&request))
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: format!("failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            warn!(provider = PROVIDER, status = status.as_u16(), "Upstream returned an error");
            return Err(match status.as_u16() {
                401 | 403 => LlmError::AuthFailed {
                    provider: PROVIDER.to_string(),
                },
                429 => LlmError::RateLimited {
                    provider: PROVIDER.to_string(),
                },
                _ => LlmError::RequestFailed {
                    provider: PROVIDER.to_string(),
                    reason: format!("HTTP {status}: {}", error_message(&body)),
                },
            });
        }

        let completion = parse_generate_response(&body)?;
        debug!(
            provider = PROVIDER,
            input_tokens = completion.input_tokens,
            output_tokens = completion.output_tokens,
            finish_reason = ?completion.finish_reason,
            "generateContent response received"
        );
        Ok(completion)
    }
}
