//! `/search-summary` and `/test-connection`.

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{AppState, MailAccess, required};
use crate::error::ApiError;
use crate::llm::summarizer::{SUMMARY_NOT_CONFIGURED, Unavailable};
use crate::mail::{aggregate, build_criteria, collect_messages};

pub const MAILBOX_NOT_CONFIGURED: &str =
    "Mailbox credentials are not configured (set EMAIL_USERNAME and EMAIL_PASSWORD)";

#[derive(Debug, Deserialize)]
pub(super) struct SearchSummaryQuery {
    subject: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSummaryResponse {
    pub summary: String,
    pub total_messages: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

pub(super) async fn search_summary(
    State(state): State<AppState>,
    query: Result<Query<SearchSummaryQuery>, QueryRejection>,
) -> Result<Json<SearchSummaryResponse>, ApiError> {
    let Query(query) = query?;
    let subject = required(query.subject.as_deref())
        .ok_or_else(|| ApiError::Validation("The 'subject' parameter is required".into()))?
        .to_string();

    let planned = build_criteria(Some(&subject), query.from.as_deref(), query.to.as_deref())
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let mail = state
        .mail
        .clone()
        .ok_or_else(|| ApiError::Configuration(MAILBOX_NOT_CONFIGURED.into()))?;

    info!(subject = %subject, criteria = %planned.criteria, "Search summary requested");

    let criteria = planned.criteria.clone();
    let messages = tokio::task::spawn_blocking(move || {
        collect_messages(mail.transport.as_ref(), &mail.credential, &criteria)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Mail task failed: {e}")))?
    .map_err(|e| ApiError::Connection(format!("Could not connect to the mailbox via IMAP: {e}")))?;

    let total_messages = messages.len();
    let transcript = aggregate(messages);

    let summary = match state.summarizer.summarize(&transcript).await {
        Ok(result) => result.text,
        Err(Unavailable::NotConfigured) => {
            warn!("Summary skipped: no model configured");
            SUMMARY_NOT_CONFIGURED.to_string()
        }
    };

    let mut notes = Vec::new();
    if total_messages == 0 {
        notes.push(format!(
            "No emails found with subject '{subject}' and the applied date filters."
        ));
    }
    notes.extend(planned.warnings);
    if transcript.truncated() {
        notes.push("The email thread was too long and was truncated before summarizing.".into());
    }

    Ok(Json(SearchSummaryResponse {
        summary,
        total_messages,
        note: (!notes.is_empty()).then(|| notes.join(" ")),
    }))
}

/// Log in and out once. Always 200; the outcome is in `status`.
pub(super) async fn test_connection(State(state): State<AppState>) -> Json<serde_json::Value> {
    let Some(MailAccess {
        transport,
        credential,
    }) = state.mail.clone()
    else {
        return Json(serde_json::json!({
            "status": "error",
            "message": MAILBOX_NOT_CONFIGURED,
        }));
    };

    let host = transport.host().to_string();
    let username = credential.username().to_string();
    let outcome =
        tokio::task::spawn_blocking(move || transport.connect(&credential).map(|s| s.close()))
            .await;

    let (status, message) = match outcome {
        Ok(Ok(())) => ("success", format!("Connected to {host} as {username}")),
        Ok(Err(e)) => {
            warn!(host = %host, error = %e, "Connection test failed");
            ("error", format!("Could not connect to {host}: {e}"))
        }
        Err(e) => ("error", format!("Connection test task failed: {e}")),
    };

    Json(serde_json::json!({ "status": status, "message": message }))
}
