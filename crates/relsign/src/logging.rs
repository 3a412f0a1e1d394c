//! # Logging Infrastructure
//!
//! Structured logging with tracing.
//!
//! Everything goes to stderr so that stdout stays free for command output,
//! and a successful `relsign sign` prints nothing at the default level. An
//! optional daily-rolling log file can be added next to the stderr output.
//!
//! ## Quick Start
//!
//! ```no_run
//! use relsign::logging::{init_logging, LogConfig, LogLevel};
//!
//! let config = LogConfig {
//!     level: LogLevel::Debug,
//!     ..Default::default()
//! };
//! let _guard = init_logging(&config)?;
//! tracing::debug!("logging initialized");
//! # Ok::<(), relsign::logging::LogError>(())
//! ```
//!
//! ## Sensitive Data Redaction
//!
//! ```
//! use relsign::logging::redact_sensitive;
//!
//! assert_eq!(redact_sensitive("/home/ci/.gnupg/release.asc"), "/hom***.asc");
//! assert_eq!(redact_sensitive("hunter2"), "***");
//! ```

use std::path::PathBuf;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Target used for security-relevant events.
pub const SECURITY_TARGET: &str = "relsign::security";

/// Error type for logging initialization failures.
#[derive(Debug, Error)]
pub enum LogError {
    /// Failed to create log file or directory
    #[error("failed to create log file: {context}")]
    FileCreation {
        /// What failed.
        context: String,
    },
    /// Failed to initialize the subscriber
    #[error("failed to initialize logging: {context}")]
    SubscriberInit {
        /// What failed.
        context: String,
    },
    /// Invalid configuration
    #[error("invalid log configuration: {context}")]
    InvalidConfig {
        /// What is wrong.
        context: String,
    },
}

impl LogError {
    /// Create a [`LogError::FileCreation`].
    #[must_use]
    pub fn file_creation(context: impl Into<String>) -> Self {
        Self::FileCreation {
            context: context.into(),
        }
    }

    /// Create a [`LogError::SubscriberInit`].
    #[must_use]
    pub fn subscriber_init(context: impl Into<String>) -> Self {
        Self::SubscriberInit {
            context: context.into(),
        }
    }

    /// Create a [`LogError::InvalidConfig`].
    #[must_use]
    pub fn invalid_config(context: impl Into<String>) -> Self {
        Self::InvalidConfig {
            context: context.into(),
        }
    }
}

/// Log level configuration.
///
/// Each level includes all messages from more severe levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// trace, debug, info, warn, error
    Trace,
    /// debug, info, warn, error
    Debug,
    /// info, warn, error
    Info,
    /// warn, error
    #[default]
    Warn,
    /// error only
    Error,
}

impl LogLevel {
    /// Convert to tracing Level.
    #[must_use]
    pub const fn as_tracing_level(self) -> Level {
        match self {
            Self::Trace => Level::TRACE,
            Self::Debug => Level::DEBUG,
            Self::Info => Level::INFO,
            Self::Warn => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }

    /// Get the string representation for env filter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable multi-line format.
    #[default]
    Pretty,
    /// JSON, one object per line.
    Json,
    /// Single-line format.
    Compact,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
            Self::Compact => write!(f, "compact"),
        }
    }
}

/// Configuration for the logging system.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Minimum severity logged. Defaults to [`LogLevel::Warn`].
    pub level: LogLevel,

    /// Output format for both stderr and the log file.
    pub format: LogFormat,

    /// Optional log file, rotated daily.
    ///
    /// The directory is created if it doesn't exist.
    pub file_path: Option<PathBuf>,

    /// Whether the caller opens a span carrying a correlation ID.
    pub correlation_ids: bool,
}

/// Guard that flushes the log file on drop.
///
/// Keep it alive until the program exits.
pub struct LogGuard {
    guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

impl LogGuard {
    const fn new(guard: Option<tracing_appender::non_blocking::WorkerGuard>) -> Self {
        Self { guard }
    }
}

impl std::fmt::Debug for LogGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogGuard")
            .field("has_file_guard", &self.guard.is_some())
            .finish()
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn stderr_layer(format: LogFormat) -> BoxedLayer {
    let layer = fmt::layer().with_writer(std::io::stderr).with_target(true);
    match format {
        LogFormat::Pretty => layer.pretty().with_span_events(FmtSpan::CLOSE).boxed(),
        LogFormat::Json => layer.json().with_current_span(true).boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}

fn file_layer(format: LogFormat, writer: tracing_appender::non_blocking::NonBlocking) -> BoxedLayer {
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);
    match format {
        LogFormat::Pretty => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}

/// Initialize the logging system.
///
/// `RUST_LOG` is not consulted; the level comes from `config` alone.
///
/// # Errors
///
/// Returns [`LogError`] if:
/// - The log file directory cannot be created
/// - The subscriber cannot be initialized (e.g., already initialized)
pub fn init_logging(config: &LogConfig) -> Result<LogGuard, LogError> {
    let filter = EnvFilter::try_new(config.level.as_str())
        .map_err(|e| LogError::invalid_config(e.to_string()))?;

    let mut layers: Vec<BoxedLayer> = vec![stderr_layer(config.format)];
    let mut guard = None;

    if let Some(ref path) = config.file_path {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => std::path::Path::new("."),
        };
        std::fs::create_dir_all(dir)
            .map_err(|e| LogError::file_creation(format!("{}: {e}", dir.display())))?;

        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| LogError::invalid_config("invalid log file name"))?;

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, worker) = tracing_appender::non_blocking(appender);
        layers.push(file_layer(config.format, non_blocking));
        guard = Some(worker);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| LogError::subscriber_init(e.to_string()))?;

    Ok(LogGuard::new(guard))
}

/// Redact a sensitive value for logging.
///
/// Values shorter than 12 characters become `***`; longer values keep their
/// first and last 4 characters.
#[must_use]
pub fn redact_sensitive(value: &str) -> String {
    const MIN_LENGTH_FOR_PARTIAL: usize = 12;
    const VISIBLE_CHARS: usize = 4;

    let chars: Vec<char> = value.chars().collect();
    let len = chars.len();
    if len < MIN_LENGTH_FOR_PARTIAL {
        return "***".to_string();
    }

    let prefix: String = chars.iter().take(VISIBLE_CHARS).collect();
    let suffix: String = chars.iter().skip(len - VISIBLE_CHARS).collect();
    format!("{prefix}***{suffix}")
}

/// Generate a correlation ID: 16 random octets as 32 lowercase hex digits.
///
/// ```
/// use relsign::logging::new_correlation_id;
///
/// let id = new_correlation_id();
/// assert_eq!(id.len(), 32);
/// assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
/// ```
#[must_use]
pub fn new_correlation_id() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

/// Create a span with correlation ID.
///
/// ```ignore
/// let id = relsign::logging::new_correlation_id();
/// let _span = relsign::with_correlation_id!(id, "sign", input = "dist/app.tar.gz").entered();
/// ```
#[macro_export]
macro_rules! with_correlation_id {
    ($id:expr, $name:expr) => {
        tracing::info_span!($name, correlation_id = %$id)
    };
    ($id:expr, $name:expr, $($fields:tt)*) => {
        tracing::info_span!($name, correlation_id = %$id, $($fields)*)
    };
}

/// Convert verbosity count to [`LogLevel`].
///
/// | Verbosity | Level |
/// |-----------|-------|
/// | 0         | Warn  |
/// | 1         | Info  |
/// | 2         | Debug |
/// | 3+        | Trace |
#[must_use]
pub const fn verbosity_to_level(verbosity: u8) -> LogLevel {
    match verbosity {
        0 => LogLevel::Warn,
        1 => LogLevel::Info,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    }
}

/// Log a security event (key unlock, signature creation) at INFO.
pub fn log_security_event(event: &str, details: &str) {
    tracing::info!(
        target: SECURITY_TARGET,
        event_type = "security",
        security_event = event,
        details = details,
        "security event: {event}"
    );
}
