//! `/analyze-sheet` and `/analyze-fixed-dataset`.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use serde::Deserialize;
use tracing::{info, warn};

use super::{AppState, required};
use crate::analysis::{AnalysisData, analyze_failures};
use crate::error::{ApiError, GoogleApiError};
use crate::google::SheetReader;
use crate::llm::prompts::sheet_summary_prompt;

const SHEETS_NOT_CONFIGURED: &str =
    "Google Sheets access is not configured (set GOOGLE_ACCESS_TOKEN)";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AnalyzeSheetQuery {
    sheet_id: Option<String>,
    range: Option<String>,
}

fn sheet_reader(state: &AppState) -> Result<Arc<dyn SheetReader>, ApiError> {
    state
        .sheets
        .clone()
        .ok_or_else(|| ApiError::Configuration(SHEETS_NOT_CONFIGURED.into()))
}

fn read_failed(e: GoogleApiError) -> ApiError {
    ApiError::Internal(format!("Error analyzing data: {e}"))
}

pub(super) async fn analyze_sheet(
    State(state): State<AppState>,
    query: Result<Query<AnalyzeSheetQuery>, QueryRejection>,
) -> Result<Json<AnalysisData>, ApiError> {
    let Query(query) = query?;
    let (Some(sheet_id), Some(range)) = (
        required(query.sheet_id.as_deref()),
        required(query.range.as_deref()),
    ) else {
        return Err(ApiError::Validation(
            "Both the sheet ID and the range are required".into(),
        ));
    };

    let reader = sheet_reader(&state)?;
    let values = reader.read_range(sheet_id, range).await.map_err(read_failed)?;
    info!(sheet_id, range, rows = values.len(), "Sheet range read");

    let mut chart = crate::analysis::analyze_sheet(&values, range, &mut rand::thread_rng())?;

    if state.summarizer.is_configured() {
        let prompt = sheet_summary_prompt(
            values.first().and_then(|h| h.get(1..)).unwrap_or_default(),
            &chart.labels,
            values.get(1..).unwrap_or_default(),
        );
        match state.summarizer.summarize_prompt(prompt).await {
            Ok(summary) => chart.summary = summary.text,
            Err(e) => warn!(error = %e, "Sheet summary skipped"),
        }
    }

    Ok(Json(AnalysisData::SheetAnalysis(chart)))
}

pub(super) async fn analyze_fixed_dataset(
    State(state): State<AppState>,
) -> Result<Json<AnalysisData>, ApiError> {
    let reader = sheet_reader(&state)?;
    let dataset = &state.fixed_dataset;
    let values = reader
        .read_range(&dataset.sheet_id, &dataset.range)
        .await
        .map_err(read_failed)?;
    info!(sheet_id = %dataset.sheet_id, rows = values.len(), "Fixed dataset read");

    let analysis = analyze_failures(&values, &mut rand::thread_rng())?;
    Ok(Json(AnalysisData::FailureAnalysis(analysis)))
}
