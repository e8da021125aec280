//! Google Sheets and Drive over REST with a pre-issued bearer token.

pub mod drive;
pub mod sheets;

pub use drive::{DriveFile, DriveSearch};
pub use sheets::SheetReader;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::GoogleApiError;

pub const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4";
pub const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for both APIs. One token, no refresh.
pub struct GoogleApiClient {
    http: reqwest::Client,
    token: SecretString,
    sheets_base: Url,
    drive_base: Url,
}

impl GoogleApiClient {
    pub fn new(token: SecretString) -> Result<Self, GoogleApiError> {
        Self::with_base_urls(token, SHEETS_BASE_URL, DRIVE_BASE_URL)
    }

    pub fn with_base_urls(
        token: SecretString,
        sheets_base: &str,
        drive_base: &str,
    ) -> Result<Self, GoogleApiError> {
        let parse = |raw: &str| {
            Url::parse(raw)
                .map_err(|e| GoogleApiError::Request(format!("invalid base URL {raw:?}: {e}")))
        };
        Ok(Self {
            http: reqwest::Client::new(),
            token,
            sheets_base: parse(sheets_base)?,
            drive_base: parse(drive_base)?,
        })
    }

    /// `base` with `segments` appended, each percent-encoded.
    fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, GoogleApiError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| GoogleApiError::Request(format!("base URL {base} cannot take a path")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, GoogleApiError> {
        debug!(path = url.path(), "Google API request");
        let response = self
            .http
            .get(url)
            .bearer_auth(self.token.expose_secret())
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| GoogleApiError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GoogleApiError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(GoogleApiError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| GoogleApiError::InvalidResponse(e.to_string()))
    }
}

/// `error.message` from a Google error body, else the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl SheetReader for GoogleApiClient {
    async fn read_range(
        &self,
        sheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, GoogleApiError> {
        let url = Self::endpoint(&self.sheets_base, &["spreadsheets", sheet_id, "values", range])?;
        let values: sheets::ValueRange = self.get_json(url).await?;
        Ok(values.into_rows())
    }
}

#[async_trait]
impl DriveSearch for GoogleApiClient {
    async fn search_files(&self, term: &str) -> Result<Vec<DriveFile>, GoogleApiError> {
        let mut url = Self::endpoint(&self.drive_base, &["files"])?;
        url.query_pairs_mut()
            .append_pair("q", &drive::name_query(term))
            .append_pair("pageSize", &drive::PAGE_SIZE.to_string())
            .append_pair("fields", "files(id,name,mimeType)");
        let list: drive::FileList = self.get_json(url).await?;
        Ok(list.files)
    }
}
