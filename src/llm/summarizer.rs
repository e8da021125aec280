//! Summarization client: turns transcripts and prompts into text results.
//!
//! Only a missing provider is an error. Upstream refusals and failures come
//! back as descriptive text so the HTTP layer can still answer 200.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::llm::prompts::transcript_summary_prompt;
use crate::llm::provider::{CompletionRequest, FinishReason, LlmProvider};
use crate::mail::{MAX_TRANSCRIPT_CHARS, Transcript, truncate_chars};

pub const SUMMARY_NOT_CONFIGURED: &str =
    "Consolidated summary unavailable (Gemini API key not configured).";
pub const NOTHING_TO_SUMMARIZE: &str = "No email content to generate a consolidated summary from.";
pub const NO_SUMMARY_GENERATED: &str =
    "Could not generate the consolidated summary (empty response from Gemini).";

const SUMMARY_CANDIDATES: u32 = 1;
const SUMMARY_MAX_TOKENS: u32 = 2500;
const SUMMARY_TEMPERATURE: f32 = 0.6;

static BLANK_LINE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("blank-line pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Unavailable {
    #[error("not configured")]
    NotConfigured,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryResult {
    pub text: String,
}

impl SummaryResult {
    fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Outcome of one upstream call, before any wording is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Text(String),
    /// The provider refused; `detail` names the reason and any safety ratings.
    Rejected { detail: String },
    Empty,
    Failed(String),
}

impl Generation {
    /// Render with the consolidated-summary wording.
    pub fn into_summary(self) -> SummaryResult {
        match self {
            Self::Text(text) => SummaryResult::new(text),
            Self::Rejected { detail } => {
                SummaryResult::new(format!("Consolidated summary not generated: {detail}"))
            }
            Self::Empty => SummaryResult::new(NO_SUMMARY_GENERATED),
            Self::Failed(reason) => SummaryResult::new(format!(
                "Error generating the consolidated AI summary with Gemini: {reason}"
            )),
        }
    }
}

/// Summary generation parameters: one candidate, bounded output, moderate temperature.
pub fn summary_request(prompt: impl Into<String>) -> CompletionRequest {
    CompletionRequest::new(prompt)
        .with_candidate_count(SUMMARY_CANDIDATES)
        .with_max_tokens(SUMMARY_MAX_TOKENS)
        .with_temperature(SUMMARY_TEMPERATURE)
}

#[derive(Clone, Default)]
pub struct Summarizer {
    provider: Option<Arc<dyn LlmProvider>>,
}

impl Summarizer {
    pub fn new(provider: Option<Arc<dyn LlmProvider>>) -> Self {
        Self { provider }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// Summarize a mail transcript. Empty transcripts never reach the provider.
    pub async fn summarize(&self, transcript: &Transcript) -> Result<SummaryResult, Unavailable> {
        let provider = self.provider()?;
        if transcript.is_empty() {
            return Ok(SummaryResult::new(NOTHING_TO_SUMMARIZE));
        }

        info!(
            model = provider.model_name(),
            messages = transcript.message_count(),
            chars = transcript.as_str().chars().count(),
            truncated = transcript.truncated(),
            "Generating consolidated summary"
        );
        let prompt = transcript_summary_prompt(transcript.as_str());
        Ok(self.generate(summary_request(prompt)).await?.into_summary())
    }

    /// Summarize an arbitrary prompt with the summary parameters.
    ///
    /// The prompt is cut at [`MAX_TRANSCRIPT_CHARS`], the same cap transcripts get.
    pub async fn summarize_prompt(&self, mut prompt: String) -> Result<SummaryResult, Unavailable> {
        let provider = self.provider()?;
        if prompt.trim().is_empty() {
            return Ok(SummaryResult::new(NOTHING_TO_SUMMARIZE));
        }

        let original_chars = prompt.chars().count();
        if truncate_chars(&mut prompt, MAX_TRANSCRIPT_CHARS) {
            info!(
                model = provider.model_name(),
                chars = original_chars,
                limit = MAX_TRANSCRIPT_CHARS,
                "Prompt exceeds the character limit; truncated"
            );
        }
        Ok(self.generate(summary_request(prompt)).await?.into_summary())
    }

    /// One upstream call with no retry. Callers choose the wording.
    pub async fn generate(&self, request: CompletionRequest) -> Result<Generation, Unavailable> {
        let provider = self.provider()?;
        let outcome = match provider.complete(request).await {
            Ok(response) => match response.finish_reason {
                FinishReason::Blocked { reason, ratings } => {
                    let mut detail = format!("content blocked by Gemini. Reason: {reason}");
                    if !ratings.is_empty() {
                        detail.push_str(&format!(" Ratings: {}", ratings.join(", ")));
                    }
                    warn!(model = provider.model_name(), %detail, "Generation rejected upstream");
                    Generation::Rejected { detail }
                }
                _ => {
                    let text = tidy(&response.content);
                    if text.is_empty() {
                        warn!(
                            model = provider.model_name(),
                            finish_reason = ?response.finish_reason,
                            "Empty generation"
                        );
                        Generation::Empty
                    } else {
                        Generation::Text(text)
                    }
                }
            },
            Err(e) => {
                warn!(model = provider.model_name(), error = %e, "Generation failed");
                Generation::Failed(e.to_string())
            }
        };
        Ok(outcome)
    }

    fn provider(&self) -> Result<&Arc<dyn LlmProvider>, Unavailable> {
        self.provider.as_ref().ok_or(Unavailable::NotConfigured)
    }
}

/// Trim and collapse runs of blank lines into a single blank line.
fn tidy(text: &str) -> String {
    BLANK_LINE_RUNS.replace_all(text.trim(), "\n\n").into_owned()
}
