//! Error types for airlookup.
//!
//! This module defines all error types used throughout the airlookup crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for airlookup operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Lookup Errors ===
    /// The given string is not a valid ICAO24 address.
    #[error("invalid ICAO24 address '{input}': expected 6 hexadecimal digits")]
    InvalidIcao24 {
        /// The rejected input.
        input: String,
    },

    /// An HTTP request could not be completed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A remote service answered with an unexpected status.
    #[error("{service} returned HTTP {status}: {body}")]
    UpstreamStatus {
        /// Which service answered.
        service: &'static str,
        /// The HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    // === Vault Errors ===
    /// No credential in the default chain could produce a token.
    #[error("credential unavailable: {0}")]
    Credential(String),

    /// The connection secret could not be resolved.
    #[error("unable to resolve secret '{name}' from {source_name}")]
    SecretUnavailable {
        /// Name of the secret.
        name: String,
        /// Where the secret was looked up.
        source_name: String,
    },

    // === Table Errors ===
    /// The table connection string is malformed or unsupported.
    #[error("invalid table connection string: {message}")]
    ConnectionString {
        /// Description of what is wrong.
        message: String,
    },

    /// Failed to open or create the local table database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A local table query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    // === Sync Errors ===
    /// The CSV header lacks a required column.
    #[error("CSV header is missing required column '{column}'")]
    CsvHeader {
        /// The missing column name.
        column: &'static str,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for airlookup operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new credential error.
    #[must_use]
    pub fn credential(message: impl Into<String>) -> Self {
        Self::Credential(message.into())
    }

    /// Create a new connection string error.
    #[must_use]
    pub fn connection_string(message: impl Into<String>) -> Self {
        Self::ConnectionString {
            message: message.into(),
        }
    }

    /// Build an upstream status error, keeping at most 200 characters of the body.
    #[must_use]
    pub fn upstream(service: &'static str, status: u16, body: &str) -> Self {
        Self::UpstreamStatus {
            service,
            status,
            body: body.chars().take(200).collect(),
        }
    }

    /// Check if this error means the connection secret was not available.
    #[must_use]
    pub fn is_secret_unavailable(&self) -> bool {
        matches!(self, Self::SecretUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_icao24_display() {
        let err = Error::InvalidIcao24 {
            input: "XYZ".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("XYZ"));
        assert!(msg.contains("6 hexadecimal digits"));
    }

    #[test]
    fn test_upstream_truncates_body() {
        let body = "x".repeat(500);
        let err = Error::upstream("metadata service", 500, &body);
        match err {
            Error::UpstreamStatus { status, body, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), 200);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_upstream_display() {
        let err = Error::upstream("metadata service", 503, "busy");
        assert_eq!(err.to_string(), "metadata service returned HTTP 503: busy");
    }

    #[test]
    fn test_secret_unavailable() {
        let err = Error::SecretUnavailable {
            name: "Storage--ConnectionString".to_string(),
            source_name: "https://example.vault.azure.net/".to_string(),
        };
        assert!(err.is_secret_unavailable());
        assert!(err.to_string().contains("Storage--ConnectionString"));
        assert!(!Error::credential("nope").is_secret_unavailable());
    }

    #[test]
    fn test_connection_string_error() {
        let err = Error::connection_string("missing AccountName");
        assert_eq!(
            err.to_string(),
            "invalid table connection string: missing AccountName"
        );
    }

    #[test]
    fn test_csv_header_error() {
        let err = Error::CsvHeader { column: "icao24" };
        assert!(err.to_string().contains("icao24"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "timeout_secs must be greater than 0".to_string(),
        };
        assert!(err.to_string().contains("timeout_secs"));
    }
}
