//! Configuration types, built from environment variables.
//!
//! Every value is read once at startup and shared read-only afterwards.

use std::net::SocketAddr;
use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::mail::MailboxCredential;

/// Values shipped in sample `.env` files; treated the same as an unset key.
const PLACEHOLDER_API_KEYS: &[&str] = &["YOUR_GEMINI_API_KEY_HERE", "TU_GEMINI_API_KEY_AQUI"];

const DEFAULT_IMAP_HOST: &str = "imap.gmail.com";
const DEFAULT_IMAP_PORT: u16 = 993;
const DEFAULT_BIND: &str = "127.0.0.1:5000";
const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";
const DEFAULT_FIXED_SHEET_ID: &str = "1UeO_fORpKELd15gOzitXD3VMCZPMSIQpR6aX9A-eyaA";
const DEFAULT_FIXED_RANGE: &str = "Import!A1:Z";

/// Full service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub mail: MailConfig,
    pub llm: LlmConfig,
    pub google: GoogleConfig,
    pub fixed_dataset: FixedDatasetConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

/// Mailbox settings. `credential` is `None` when username or password is unset.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub imap_host: String,
    pub imap_port: u16,
    pub credential: Option<MailboxCredential>,
}

/// Generative model settings. `api_key` is `None` when summaries are disabled.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub model: String,
}

/// Bearer token for the Sheets and Drive APIs, issued out of band.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub access_token: Option<SecretString>,
}

/// The spreadsheet behind `/analyze-fixed-dataset`.
#[derive(Debug, Clone)]
pub struct FixedDatasetConfig {
    pub sheet_id: String,
    pub range: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl AppConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_raw = get("MAIL_DIGEST_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                key: "MAIL_DIGEST_BIND".into(),
                message: format!("{bind_raw:?}: {e}"),
            })?;

        let imap_port = match get("EMAIL_IMAP_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "EMAIL_IMAP_PORT".into(),
                message: format!("{raw:?}: {e}"),
            })?,
            None => DEFAULT_IMAP_PORT,
        };

        let credential = match (get("EMAIL_USERNAME"), get("EMAIL_PASSWORD")) {
            (Some(username), Some(password)) => Some(MailboxCredential::new(username, password)),
            _ => None,
        };

        let api_key = get("GOOGLE_API_KEY")
            .filter(|k| !PLACEHOLDER_API_KEYS.contains(&k.as_str()))
            .map(SecretString::from);

        let format = match get("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "LOG_FORMAT".into(),
                    message: format!("{other:?} (expected \"text\" or \"json\")"),
                });
            }
        };

        Ok(Self {
            server: ServerConfig { bind },
            mail: MailConfig {
                imap_host: get("EMAIL_IMAP_HOST").unwrap_or_else(|| DEFAULT_IMAP_HOST.to_string()),
                imap_port,
                credential,
            },
            llm: LlmConfig {
                api_key,
                model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            },
            google: GoogleConfig {
                access_token: get("GOOGLE_ACCESS_TOKEN").map(SecretString::from),
            },
            fixed_dataset: FixedDatasetConfig {
                sheet_id: get("FIXED_DATASET_SHEET_ID")
                    .unwrap_or_else(|| DEFAULT_FIXED_SHEET_ID.to_string()),
                range: get("FIXED_DATASET_RANGE").unwrap_or_else(|| DEFAULT_FIXED_RANGE.to_string()),
            },
            logging: LoggingConfig {
                format,
                file: get("LOG_FILE").map(PathBuf::from),
            },
        })
    }

    /// Human-readable list of missing pieces, logged at startup.
    pub fn missing_features(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.mail.credential.is_none() {
            missing.push("EMAIL_USERNAME/EMAIL_PASSWORD (mail search disabled)");
        }
        if self.llm.api_key.is_none() {
            missing.push("GOOGLE_API_KEY (AI summaries disabled)");
        }
        if self.google.access_token.is_none() {
            missing.push("GOOGLE_ACCESS_TOKEN (Sheets and Drive disabled)");
        }
        missing
    }
}
