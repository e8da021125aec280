//! Drive file search.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GoogleApiError;

/// Maximum files returned per search.
pub const PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[async_trait]
pub trait DriveSearch: Send + Sync {
    /// Non-trashed files whose name contains `term`, at most [`PAGE_SIZE`].
    async fn search_files(&self, term: &str) -> Result<Vec<DriveFile>, GoogleApiError>;
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileList {
    #[serde(default)]
    pub(crate) files: Vec<DriveFile>,
}

/// Drive `q` expression for a name search. Quotes and backslashes in the
/// term are escaped.
pub fn name_query(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('\'', "\\'");
    format!("name contains '{escaped}' and trashed = false")
}
