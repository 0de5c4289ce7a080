//! Forwards `tracing` events to a host-provided logger.

use std::{
    fmt::{self, Write as _},
    sync::{Arc, OnceLock},
};

use tracing::{
    field::{Field, Visit},
    Event, Level, Subscriber,
};
use tracing_log::NormalizeEvent;
use tracing_subscriber::{
    filter::LevelFilter,
    layer::{Context, SubscriberExt},
    EnvFilter, Layer, Registry,
};

/// Trait representing a logger that can log messages at various levels.
///
/// This trait should be implemented by any logger that wants to receive log messages.
/// It is exported via `UniFFI` for use in foreign languages.
///
/// # Examples
///
/// Implementing the `Logger` trait:
///
/// ```rust
/// use credex_core::logger::{Logger, LogLevel};
///
/// struct MyLogger;
///
/// impl Logger for MyLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         println!("[{:?}] {}", level, message);
///     }
/// }
/// ```
///
/// ## Swift
///
/// ```swift
/// class CredexLoggerBridge: Credex.Logger {
///     static let shared = CredexLoggerBridge()
///
///     func log(level: Credex.LogLevel, message: String) {
///         Log.log(level.toCoreLevel(), message)
///     }
/// }
///
/// public func setupCredexLogger() {
///     Credex.setLogger(logger: CredexLoggerBridge.shared)
/// }
/// ```
///
/// ## Kotlin
///
/// ```kotlin
/// object CredexLoggerBridge : Logger {
///     override fun log(level: LogLevel, message: String) {
///         Log.println(level.toAndroidPriority(), "credex", message)
///     }
/// }
///
/// setLogger(CredexLoggerBridge) // once, from Application.onCreate
/// ```
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Logs a message at the specified log level.
    ///
    /// # Arguments
    ///
    /// * `level` - The severity level of the log message.
    /// * `message` - The log message, followed by its structured fields as
    ///   `key=value` pairs.
    fn log(&self, level: LogLevel, message: String);
}

/// Enumeration of possible log levels.
///
/// This enum represents the severity levels that can be used when logging messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum LogLevel {
    /// Designates very low priority, often extremely detailed messages.
    Trace,
    /// Designates lower priority debugging information.
    Debug,
    /// Designates informational messages that highlight the progress of the application.
    Info,
    /// Designates potentially harmful situations.
    Warn,
    /// Designates error events that might still allow the application to continue running.
    Error,
}

impl From<&Level> for LogLevel {
    fn from(level: &Level) -> Self {
        if *level == Level::ERROR {
            Self::Error
        } else if *level == Level::WARN {
            Self::Warn
        } else if *level == Level::INFO {
            Self::Info
        } else if *level == Level::DEBUG {
            Self::Debug
        } else {
            Self::Trace
        }
    }
}

/// A `tracing` layer that forwards events to a user-provided [`Logger`].
///
/// Records emitted through the `log` facade reach it via
/// [`tracing_log::LogTracer`] and keep their original target.
struct ForeignLayer {
    logger: Arc<dyn Logger>,
}

impl<S: Subscriber> Layer<S> for ForeignLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let normalized = event.normalized_metadata();
        let metadata = normalized.as_ref().unwrap_or_else(|| event.metadata());

        // Debug and Trace records from dependencies are noise for the host.
        let is_from_credex = metadata.target().starts_with("credex");
        let level = metadata.level();
        if !is_from_credex && (*level == Level::DEBUG || *level == Level::TRACE) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.logger.log(LogLevel::from(level), visitor.finish());
    }
}

/// Renders an event as its message followed by `key=value` fields.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn push_field(&mut self, name: &str, value: fmt::Arguments<'_>) {
        // Metadata of bridged `log` records.
        if name.starts_with("log.") {
            return;
        }
        let _ = write!(self.fields, " {name}={value}");
    }

    fn finish(self) -> String {
        self.message + &self.fields
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.push_field(field.name(), format_args!("{value}"));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            self.push_field(field.name(), format_args!("{value:?}"));
        }
    }
}

/// A global instance of the user-provided logger.
static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Sets the global logger.
///
/// All `tracing` events of this crate (and `log` records of its dependencies)
/// are forwarded to `logger` from then on. It should be called once, before
/// the runtime is created.
///
/// # Note
///
/// If a logger has already been set, this function prints a message and does
/// nothing.
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(Arc::clone(&logger)).is_err() {
        println!("Logger already set");
        return;
    }

    let subscriber = Registry::default()
        .with(LevelFilter::TRACE)
        .with(ForeignLayer { logger });
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set logger: {e}");
        return;
    }
    if let Err(e) = tracing_log::LogTracer::init_with_filter(log::LevelFilter::Trace) {
        eprintln!("Failed to bridge log records: {e}");
    }
}

/// Installs a `fmt` subscriber writing to stderr, for Rust hosts and tests.
///
/// `RUST_LOG` takes precedence over `filter` when set. Returns `false` if a
/// global subscriber was already installed.
pub fn init_stderr_logging(filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tracing::{debug, info, warn};

    use super::*;

    #[derive(Default)]
    struct RecordingLogger {
        lines: Mutex<Vec<(LogLevel, String)>>,
    }

    impl Logger for RecordingLogger {
        fn log(&self, level: LogLevel, message: String) {
            self.lines.lock().unwrap().push((level, message));
        }
    }

    fn with_recording(f: impl FnOnce()) -> Vec<(LogLevel, String)> {
        let logger = Arc::new(RecordingLogger::default());
        let subscriber = Registry::default().with(ForeignLayer {
            logger: Arc::clone(&logger) as Arc<dyn Logger>,
        });
        tracing::subscriber::with_default(subscriber, f);
        let lines = logger.lines.lock().unwrap();
        lines.clone()
    }

    #[test]
    fn test_message_and_fields_are_rendered() {
        let lines = with_recording(|| {
            warn!(command_handle = 7, operation = "vcx_connection_create", "late completion");
        });
        assert_eq!(
            lines,
            vec![(
                LogLevel::Warn,
                "late completion command_handle=7 operation=vcx_connection_create".to_string()
            )]
        );
    }

    #[test]
    fn test_foreign_debug_records_are_dropped() {
        let lines = with_recording(|| {
            debug!(target: "hyper::proto", "noise");
            info!(target: "hyper::proto", "kept");
            debug!("own debug");
        });
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], (LogLevel::Info, "kept".to_string()));
        assert_eq!(lines[1].0, LogLevel::Debug);
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(LogLevel::from(&Level::ERROR), LogLevel::Error);
        assert_eq!(LogLevel::from(&Level::TRACE), LogLevel::Trace);
    }
}
