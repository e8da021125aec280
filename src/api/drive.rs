//! `/drive-search`.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{AppState, required};
use crate::error::ApiError;
use crate::google::DriveFile;

const DRIVE_NOT_CONFIGURED: &str =
    "Google Drive access is not configured (set GOOGLE_ACCESS_TOKEN)";

#[derive(Debug, Deserialize)]
pub(super) struct DriveSearchRequest {
    query: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct DriveSearchResponse {
    files: Vec<DriveFile>,
}

pub(super) async fn drive_search(
    State(state): State<AppState>,
    body: Result<Json<DriveSearchRequest>, JsonRejection>,
) -> Result<Json<DriveSearchResponse>, ApiError> {
    let Json(body) = body?;
    let term = required(body.query.as_deref())
        .ok_or_else(|| ApiError::Validation("The search query is required".into()))?;
    let drive = state
        .drive
        .clone()
        .ok_or_else(|| ApiError::Configuration(DRIVE_NOT_CONFIGURED.into()))?;

    let files = drive
        .search_files(term)
        .await
        .map_err(|e| ApiError::Internal(format!("Drive search failed: {e}")))?;
    info!(term, found = files.len(), "Drive search");

    Ok(Json(DriveSearchResponse { files }))
}
