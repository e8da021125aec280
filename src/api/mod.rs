//! HTTP surface: shared state, router and handlers.

mod analysis;
mod assistant;
mod drive;
mod mail;

pub use assistant::{ASSISTANT_NOT_CONFIGURED, NO_ANALYSIS_DATA};
pub use mail::{MAILBOX_NOT_CONFIGURED, SearchSummaryResponse};

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::FixedDatasetConfig;
use crate::error::ApiError;
use crate::google::{DriveSearch, SheetReader};
use crate::llm::Summarizer;
use crate::mail::{MailTransport, MailboxCredential};

/// Transport plus the login it uses.
#[derive(Clone)]
pub struct MailAccess {
    pub transport: Arc<dyn MailTransport>,
    pub credential: MailboxCredential,
}

/// Application state shared across handlers. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    /// `None` when mailbox credentials are not configured.
    pub mail: Option<MailAccess>,
    pub summarizer: Summarizer,
    /// `None` when no Google access token is configured.
    pub sheets: Option<Arc<dyn SheetReader>>,
    pub drive: Option<Arc<dyn DriveSearch>>,
    pub fixed_dataset: FixedDatasetConfig,
}

/// Build the router with every endpoint, permissive CORS and request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search-summary", get(mail::search_summary))
        .route("/test-connection", get(mail::test_connection))
        .route("/analyze-sheet", get(analysis::analyze_sheet))
        .route("/analyze-fixed-dataset", get(analysis::analyze_fixed_dataset))
        .route("/assistant-query", post(assistant::assistant_query))
        .route("/drive-search", post(drive::drive_search))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "mail-digest"
    }))
}

// ── Shared helpers ──────────────────────────────────────────────────────

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(format!("Invalid query string: {}", rejection.body_text()))
    }
}

/// Trimmed value, or `None` when absent or blank.
fn required(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use tower::ServiceExt;

    use super::*;

    fn bare_state() -> AppState {
        AppState {
            mail: None,
            summarizer: Summarizer::default(),
            sheets: None,
            drive: None,
            fixed_dataset: FixedDatasetConfig {
                sheet_id: "sheet".into(),
                range: "A1:Z".into(),
            },
        }
    }

    #[test]
    fn required_rejects_blank() {
        assert_eq!(required(Some("  x ")), Some("x"));
        assert_eq!(required(Some("   ")), None);
        assert_eq!(required(None), None);
    }

    #[tokio::test]
    async fn preflight_allows_any_origin() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/assistant-query")
            .header(header::ORIGIN, "http://localhost:8080")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = router(bare_state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn missing_json_content_type_is_a_json_error() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/drive-search")
            .body(Body::from(r#"{"query":"x"}"#))
            .unwrap();

        let response = router(bare_state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));
    }
}
