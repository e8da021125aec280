//! `/assistant-query`: answer a question about an analysis the client holds.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::{AppState, required};
use crate::analysis::AnalysisData;
use crate::error::ApiError;
use crate::llm::{AssistantPrompt, CompletionRequest, Generation, Unavailable};

pub const NO_ANALYSIS_DATA: &str =
    "Sorry, I don't have any analysis data available to answer your question.";
pub const ASSISTANT_NOT_CONFIGURED: &str =
    "Sorry, the AI assistant is not available (Gemini API key not configured).";
const NO_ANSWER: &str = "I couldn't generate a suitable answer with the available data.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AssistantQueryRequest {
    query: Option<String>,
    #[serde(default)]
    context: Vec<Value>,
    #[serde(default)]
    analysis_data: Option<Value>,
}

#[derive(Debug, Serialize)]
pub(super) struct AssistantQueryResponse {
    response: String,
}

impl AssistantQueryResponse {
    fn new(response: impl Into<String>) -> Json<Self> {
        Json(Self {
            response: response.into(),
        })
    }
}

/// `null`, `{}` or absent means the client has nothing to ask about yet.
fn parse_analysis(raw: Option<Value>) -> Result<Option<AnalysisData>, ApiError> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) if map.is_empty() => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ApiError::Validation(format!("Unrecognized analysisData: {e}"))),
    }
}

pub(super) async fn assistant_query(
    State(state): State<AppState>,
    body: Result<Json<AssistantQueryRequest>, JsonRejection>,
) -> Result<Json<AssistantQueryResponse>, ApiError> {
    let Json(body) = body?;
    let query = required(body.query.as_deref())
        .ok_or_else(|| ApiError::Validation("The query is required".into()))?;

    let Some(analysis) = parse_analysis(body.analysis_data)? else {
        return Ok(AssistantQueryResponse::new(NO_ANALYSIS_DATA));
    };

    let prompt = AssistantPrompt {
        query,
        context: &body.context,
        analysis: &analysis,
    }
    .render();
    info!(chars = prompt.chars().count(), turns = body.context.len(), "Assistant query");

    let answer = match state.summarizer.generate(CompletionRequest::new(prompt)).await {
        Err(Unavailable::NotConfigured) => ASSISTANT_NOT_CONFIGURED.to_string(),
        Ok(Generation::Text(text)) => text,
        Ok(Generation::Empty) => NO_ANSWER.to_string(),
        Ok(Generation::Rejected { detail }) => {
            format!("Sorry, I couldn't answer your question: {detail}")
        }
        Ok(Generation::Failed(reason)) => {
            format!("Sorry, I couldn't process your question due to an error: {reason}")
        }
    };

    Ok(AssistantQueryResponse::new(answer))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_analysis_values_mean_none() {
        assert_eq!(parse_analysis(None).unwrap(), None);
        assert_eq!(parse_analysis(Some(Value::Null)).unwrap(), None);
        assert_eq!(parse_analysis(Some(json!({}))).unwrap(), None);
    }

    #[test]
    fn unknown_analysis_is_a_validation_error() {
        let err = parse_analysis(Some(json!({"type": "weather"}))).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(parse_analysis(Some(json!("text"))).is_err());
    }

    #[test]
    fn tagged_analysis_parses() {
        let parsed = parse_analysis(Some(json!({"type": "email_report", "subject": "s"}))).unwrap();
        assert!(matches!(parsed, Some(AnalysisData::EmailReport(_))));
    }
}
