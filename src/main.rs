use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use mail_digest::api::{self, AppState, MailAccess};
use mail_digest::config::{AppConfig, LogFormat, LoggingConfig};
use mail_digest::google::{DriveSearch, GoogleApiClient, SheetReader};
use mail_digest::llm::{Summarizer, create_provider};
use mail_digest::mail::{ImapTransport, MailTransport};

const DEFAULT_FILTER: &str = "mail_digest=info,tower_http=info";
const DEFAULT_LOG_FILE_NAME: &str = "mail-digest.log";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let _log_guard = init_tracing(&config.logging);

    // Install rustls crypto provider before any TLS usage
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("A rustls crypto provider was already installed");
    }

    eprintln!("📬 mail-digest v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Mailbox: {}:{}", config.mail.imap_host, config.mail.imap_port);
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   HTTP: http://{}", config.server.bind);
    for missing in config.missing_features() {
        warn!("Not configured: {missing}");
    }

    let state = build_state(&config)?;
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    info!(addr = %config.server.bind, "HTTP server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shut down cleanly");
    Ok(())
}

fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let mail = config.mail.credential.clone().map(|credential| {
        let transport: Arc<dyn MailTransport> = Arc::new(ImapTransport::new(
            config.mail.imap_host.clone(),
            config.mail.imap_port,
        ));
        MailAccess {
            transport,
            credential,
        }
    });

    let (sheets, drive) = match config.google.access_token.clone() {
        Some(token) => {
            let client = Arc::new(GoogleApiClient::new(token).context("Google API client")?);
            let sheets: Arc<dyn SheetReader> = client.clone();
            let drive: Arc<dyn DriveSearch> = client;
            (Some(sheets), Some(drive))
        }
        None => (None, None),
    };

    Ok(AppState {
        mail,
        summarizer: Summarizer::new(create_provider(&config.llm)),
        sheets,
        drive,
        fixed_dataset: config.fixed_dataset.clone(),
    })
}

/// Console or daily-rotated file output, text or JSON. The returned guard
/// flushes the file writer on drop.
fn init_tracing(logging: &LoggingConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = match &logging.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(std::path::Path::new("."));
            let file_name = path
                .file_name()
                .and_then(|f| f.to_str())
                .unwrap_or(DEFAULT_LOG_FILE_NAME);
            let appender = tracing_appender::rolling::daily(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            match logging.format {
                LogFormat::Json => registry
                    .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                    .init(),
                LogFormat::Text => registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_writer(writer)
                            .with_ansi(false),
                    )
                    .init(),
            }
            Some(guard)
        }
        None => {
            match logging.format {
                LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
                LogFormat::Text => registry
                    .with(tracing_subscriber::fmt::layer().with_target(false))
                    .init(),
            }
            None
        }
    };

    info!(
        format = ?logging.format,
        file = logging.file.as_deref().map(|p| p.display().to_string()).as_deref().unwrap_or("(stderr)"),
        "Logging initialized"
    );
    guard
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
