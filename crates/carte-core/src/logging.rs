//! Structured logging schema and subscriber setup.
//!
//! All crates use these field names for consistent structured logging so log
//! queries work the same way across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | An operation failed and the caller gets a rejection |
//! | WARN  | Recoverable issue, e.g. a document that could not be decoded |
//! | INFO  | Lifecycle events, completed mutations |
//! | DEBUG | Decision points, state transitions |
//! | TRACE | Per-document iteration |

use std::path::Path;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};
use crate::defaults;
use crate::error::{Error, Result};

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "store", "storage", "auth", "state"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "categories", "menu_items", "memory_store", "container"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "add", "update", "delete", "fetch_all"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Document collection being operated on.
pub const COLLECTION: &str = "collection";

/// Document id being operated on.
pub const DOC_ID: &str = "doc_id";

/// Object storage path.
pub const STORAGE_PATH: &str = "storage_path";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of documents returned or written.
pub const RESULT_COUNT: &str = "result_count";

/// Number of dependent menu items found for a category.
pub const DEPENDENTS: &str = "dependents";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured filter. When a log file
/// is configured the returned guard must be kept alive to flush it.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.filter.as_deref().unwrap_or(defaults::LOG_FILTER)))
        .map_err(|e| Error::Config(format!("invalid log filter: {}", e)))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = config.file {
        let file_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or(defaults::LOG_FILE_NAME);
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        match config.format {
            LogFormat::Json => registry
                .with(fmt::layer().json().with_writer(non_blocking))
                .try_init(),
            // no ANSI in files unless asked for
            LogFormat::Text => registry
                .with(
                    fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(config.ansi.unwrap_or(false)),
                )
                .try_init(),
        }
        .map_err(|e| Error::Config(format!("tracing already initialized: {}", e)))?;
        Some(guard)
    } else {
        match config.format {
            LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
            LogFormat::Text => {
                let mut layer = fmt::layer();
                if let Some(ansi) = config.ansi {
                    layer = layer.with_ansi(ansi);
                }
                registry.with(layer).try_init()
            }
        }
        .map_err(|e| Error::Config(format!("tracing already initialized: {}", e)))?;
        None
    };

    info!(
        log_format = %config.format,
        log_file = config
            .file
            .as_deref()
            .and_then(|p| p.to_str())
            .unwrap_or("(stdout)"),
        "Logging initialized"
    );

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_are_snake_case() {
        for field in [
            SUBSYSTEM,
            COMPONENT,
            OPERATION,
            COLLECTION,
            DOC_ID,
            STORAGE_PATH,
            DURATION_MS,
            RESULT_COUNT,
            DEPENDENTS,
            SUCCESS,
            ERROR_MSG,
        ] {
            assert!(field
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }

    #[test]
    fn test_init_tracing_twice_reports_config_error() {
        let config = LoggingConfig {
            filter: Some("carte_core=debug".to_string()),
            ..Default::default()
        };

        // The first call may race with other tests installing a subscriber,
        // but a second call in the same process can never succeed.
        let _ = init_tracing(&config);
        let second = init_tracing(&config);

        assert!(matches!(second, Err(Error::Config(_))));
    }

    #[test]
    fn test_init_tracing_rejects_bad_filter() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig {
            filter: Some("carte_core=notalevel".to_string()),
            ..Default::default()
        };

        assert!(matches!(init_tracing(&config), Err(Error::Config(_))));
    }
}
