//! Error types for telemetry ingestion, archive unpacking and reference lookups.
//!
//! All errors implement the `std::error::Error` trait and carry structured
//! context for debugging and recovery guidance.
//!
//! ## Error Categories
//!
//! - **Transient I/O**: the frame channel is missing or busy ([`TelemetryError::ChannelMissing`],
//!   [`TelemetryError::Contention`]); retried with backoff, never fatal
//! - **File Errors**: problems reading the save archive or writing extracted segments
//! - **Archive Errors**: structural corruption of the save container ([`ArchiveError`])
//! - **Database Errors**: failed queries against the extracted primary segment
//! - **Parse Errors**: malformed frame payloads or configuration documents
//! - **Missing Reference Data**: a cache key was requested before any refresh succeeded
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use pitlane::TelemetryError;
//! use std::time::Duration;
//!
//! let error = TelemetryError::contention("frame channel locked by producer");
//! assert!(error.is_retryable());
//! assert_eq!(error.backoff(), Duration::from_millis(1));
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[cfg(windows)]
use windows_core as core;

/// Result type alias for telemetry operations.
pub type Result<T, E = TelemetryError> = std::result::Result<T, E>;

/// Backoff after the frame channel (or its directory) was not found.
pub const MISSING_CHANNEL_BACKOFF: Duration = Duration::from_secs(1);
/// Backoff after the producer held the channel while we tried to read it.
pub const CONTENTION_BACKOFF: Duration = Duration::from_millis(1);
/// Backoff after any other read failure.
pub const UNEXPECTED_BACKOFF: Duration = Duration::from_millis(100);

/// Main error type for telemetry operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TelemetryError {
    #[error("Frame channel not found: {path}")]
    ChannelMissing { path: PathBuf },

    #[error("Frame channel busy: {context}")]
    Contention {
        context: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Save archive is corrupt: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Reference query failed: {context}")]
    Database {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("No cached reference value for '{key}'")]
    MissingKey { key: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("{feature} is only available on {required_platform}")]
    UnsupportedPlatform { feature: String, required_platform: String },

    #[error("Windows API error: {operation}")]
    #[cfg(windows)]
    WindowsApi {
        operation: String,
        #[source]
        source: core::Error,
    },
}

/// Structural corruption of a save container.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ArchiveError {
    #[error("database section signature not found")]
    SignatureNotFound,

    #[error("container truncated at {field} (offset {offset})")]
    Truncated { field: &'static str, offset: usize },

    #[error("segment {segment} declares {declared} bytes but only {available} remain")]
    SegmentOverrun { segment: &'static str, declared: usize, available: usize },

    #[error(
        "decompression failed (with header skip: {with_header_skip}; without: {without_header_skip})"
    )]
    Decompression { with_header_skip: String, without_header_skip: String },
}

impl TelemetryError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TelemetryError::ChannelMissing { .. } => true,
            TelemetryError::Contention { .. } => true,
            TelemetryError::Timeout { .. } => true,
            TelemetryError::File { .. } => true,
            TelemetryError::Archive(_) => false,
            TelemetryError::Database { .. } => false,
            TelemetryError::Parse { .. } => false,
            TelemetryError::MissingKey { .. } => true,
            TelemetryError::Config { .. } => false,
            TelemetryError::UnsupportedPlatform { .. } => false,
            #[cfg(windows)]
            TelemetryError::WindowsApi { .. } => true,
        }
    }

    /// Delay the polling worker should wait before the next read attempt.
    pub fn backoff(&self) -> Duration {
        match self {
            TelemetryError::ChannelMissing { .. } => MISSING_CHANNEL_BACKOFF,
            TelemetryError::Contention { .. } => CONTENTION_BACKOFF,
            _ => UNEXPECTED_BACKOFF,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TelemetryError::ChannelMissing { .. } => vec![
                "Start the telemetry producer",
                "Check the configured channel path",
                "Wait for the game to reach a session",
            ],
            TelemetryError::Contention { .. } => {
                vec!["Retry shortly, the producer is mid-write", "Lower the producer write rate"]
            }
            TelemetryError::File { .. } => vec![
                "Check file exists and is readable",
                "Ensure the output directory is writable",
                "Check file permissions",
            ],
            TelemetryError::Archive(_) => vec![
                "Wait for the game to finish writing the save",
                "Verify the save file belongs to a supported game version",
            ],
            TelemetryError::Database { .. } => vec![
                "Verify the extracted main database is intact",
                "Check the save belongs to a supported game version",
            ],
            TelemetryError::Parse { .. } => vec![
                "Check data format compatibility",
                "Verify source data integrity",
            ],
            TelemetryError::MissingKey { .. } => vec![
                "Refresh the reference cache first",
                "Check the configured save path",
            ],
            TelemetryError::Config { .. } => {
                vec!["Fix the configuration value named in the message", "Remove the key to use its default"]
            }
            TelemetryError::Timeout { .. } => {
                vec!["Increase shutdown_timeout_ms", "Check the frame source is not blocking"]
            }
            TelemetryError::UnsupportedPlatform { .. } => vec![
                "Use the file-backed region or stream source instead",
                "Check documentation for platform requirements",
            ],
            #[cfg(windows)]
            TelemetryError::WindowsApi { .. } => vec![
                "Check the producer created the named region",
                "Verify system resources availability",
            ],
        }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        TelemetryError::File { path, source }
    }

    /// Helper constructor for a missing frame channel.
    pub fn channel_missing(path: impl Into<PathBuf>) -> Self {
        TelemetryError::ChannelMissing { path: path.into() }
    }

    /// Helper constructor for transient channel contention.
    pub fn contention(context: impl Into<String>) -> Self {
        TelemetryError::Contention { context: context.into(), source: None }
    }

    /// Helper constructor for database errors.
    pub fn database(context: impl Into<String>, source: rusqlite::Error) -> Self {
        TelemetryError::Database { context: context.into(), source }
    }

    /// Helper constructor for parse errors.
    pub fn parse(context: impl Into<String>, details: impl Into<String>) -> Self {
        TelemetryError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for missing cache keys.
    pub fn missing_key(key: impl Into<String>) -> Self {
        TelemetryError::MissingKey { key: key.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        TelemetryError::Config { reason: reason.into() }
    }

    /// Helper constructor for Windows API errors.
    #[cfg(windows)]
    pub fn windows_api_error(operation: impl Into<String>, source: core::Error) -> Self {
        TelemetryError::WindowsApi { operation: operation.into(), source }
    }

    /// Helper constructor for unsupported platform errors.
    pub fn unsupported_platform(
        feature: impl Into<String>,
        required_platform: impl Into<String>,
    ) -> Self {
        TelemetryError::UnsupportedPlatform {
            feature: feature.into(),
            required_platform: required_platform.into(),
        }
    }

    /// Classify an I/O error raised while opening or reading the frame channel.
    ///
    /// "Not found" becomes [`TelemetryError::ChannelMissing`]; sharing violations,
    /// lock conflicts and short reads become [`TelemetryError::Contention`].
    pub fn from_channel_io(path: &std::path::Path, err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        // ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
        const SHARING_VIOLATION: i32 = 32;
        const LOCK_VIOLATION: i32 = 33;

        match err.kind() {
            ErrorKind::NotFound => TelemetryError::channel_missing(path),
            ErrorKind::PermissionDenied
            | ErrorKind::WouldBlock
            | ErrorKind::Interrupted
            | ErrorKind::UnexpectedEof => TelemetryError::Contention {
                context: format!("reading {}", path.display()),
                source: Some(err),
            },
            _ if matches!(err.raw_os_error(), Some(SHARING_VIOLATION | LOCK_VIOLATION)) => {
                TelemetryError::Contention {
                    context: format!("reading {}", path.display()),
                    source: Some(err),
                }
            }
            _ => TelemetryError::File { path: path.to_path_buf(), source: err },
        }
    }
}

impl From<std::io::Error> for TelemetryError {
    fn from(err: std::io::Error) -> Self {
        TelemetryError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

#[cfg(windows)]
impl From<core::Error> for TelemetryError {
    fn from(err: core::Error) -> Self {
        TelemetryError::WindowsApi {
            operation: "Unknown Windows operation".to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;
    use std::path::Path;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_carry_their_context(
            reason in ".*",
            key in "\\w+",
            declared in 1usize..1_000_000usize,
            available in 0usize..1_000_000usize,
          ) {
            let config_msg = TelemetryError::config(reason.clone()).to_string();
            prop_assert!(config_msg.contains(&reason));

            let key_msg = TelemetryError::missing_key(key.clone()).to_string();
            prop_assert!(key_msg.contains(&key));

            let overrun = TelemetryError::from(ArchiveError::SegmentOverrun {
              segment: "main",
              declared,
              available,
            });
            let overrun_msg = overrun.to_string();
            prop_assert!(overrun_msg.contains("corrupt"));
            let source_msg = std::error::Error::source(&overrun).map(|s| s.to_string()).unwrap_or_default();
            prop_assert!(source_msg.contains(&declared.to_string()));
            prop_assert!(source_msg.contains(&available.to_string()));
          }
        }
    }

    #[test]
    fn channel_io_classification() {
        let path = Path::new("/tmp/frames.bin");

        let missing = TelemetryError::from_channel_io(path, std::io::Error::from(ErrorKind::NotFound));
        assert!(matches!(missing, TelemetryError::ChannelMissing { .. }));
        assert_eq!(missing.backoff(), MISSING_CHANNEL_BACKOFF);

        let busy =
            TelemetryError::from_channel_io(path, std::io::Error::from(ErrorKind::PermissionDenied));
        assert!(matches!(busy, TelemetryError::Contention { .. }));
        assert_eq!(busy.backoff(), CONTENTION_BACKOFF);

        let torn =
            TelemetryError::from_channel_io(path, std::io::Error::from(ErrorKind::UnexpectedEof));
        assert!(matches!(torn, TelemetryError::Contention { .. }));

        let sharing = TelemetryError::from_channel_io(path, std::io::Error::from_raw_os_error(32));
        if cfg!(windows) {
            assert!(matches!(sharing, TelemetryError::Contention { .. }));
        }

        let other = TelemetryError::from_channel_io(path, std::io::Error::other("boom"));
        assert!(matches!(other, TelemetryError::File { .. }));
        assert_eq!(other.backoff(), UNEXPECTED_BACKOFF);
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<TelemetryError>();

        let error = TelemetryError::contention("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn recovery_methods_work() {
        let transient = TelemetryError::channel_missing("/tmp/missing");
        let corrupt = TelemetryError::from(ArchiveError::SignatureNotFound);
        let config = TelemetryError::config("history.max_laps must be positive");

        assert!(transient.is_retryable());
        assert!(!corrupt.is_retryable());
        assert!(!config.is_retryable());

        for error in [&transient, &corrupt, &config] {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty());
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn from_conversions_work() {
        let io_err = std::io::Error::new(ErrorKind::NotFound, "test file");
        let telemetry_err: TelemetryError = io_err.into();

        match telemetry_err {
            TelemetryError::File { source, .. } => {
                assert_eq!(source.to_string(), "test file");
            }
            _ => panic!("Expected File error variant"),
        }
    }
}
