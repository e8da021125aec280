//! LLM integration for mail-digest.
//!
//! Supports:
//! - **Gemini**: direct `generateContent` calls over reqwest
//!
//! `Summarizer` wraps the optional provider; prompts live in [`prompts`].

pub mod gemini;
pub mod prompts;
pub mod provider;
pub mod summarizer;

pub use gemini::GeminiProvider;
pub use prompts::AssistantPrompt;
pub use provider::*;
pub use summarizer::{Generation, Summarizer, SummaryResult, Unavailable};

use std::sync::Arc;

use crate::config::LlmConfig;

/// Create the configured provider, or `None` when no API key is set.
pub fn create_provider(config: &LlmConfig) -> Option<Arc<dyn LlmProvider>> {
    let Some(api_key) = config.api_key.clone() else {
        tracing::warn!("GOOGLE_API_KEY not set; AI summaries disabled");
        return None;
    };
    tracing::info!("Using Gemini (model: {})", config.model);
    Some(Arc::new(GeminiProvider::new(api_key, config.model.clone())))
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    #[test]
    fn provider_needs_api_key() {
        let config = LlmConfig {
            api_key: None,
            model: "gemini-1.5-flash-latest".to_string(),
        };
        assert!(create_provider(&config).is_none());
    }

    #[test]
    fn provider_reports_configured_model() {
        let config = LlmConfig {
            api_key: Some(SecretString::from("test-key")),
            model: "gemini-1.5-pro".to_string(),
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "gemini-1.5-pro");
    }
}
