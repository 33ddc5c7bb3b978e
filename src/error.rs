//! Error types for the cvrf-bulletin crate.
//!
//! This module provides the single error type [`BulletinError`] covering all
//! failure modes of the pipeline, from the network fetch down to the
//! aggregation step's no-reportable-data condition.

use std::io;

/// The main error type for all operations in this crate.
#[derive(Debug, thiserror::Error)]
pub enum BulletinError {
    /// HTTP request failed (network unreachable, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The bulletin for the requested month returned 404: Microsoft has not
    /// published it yet. Distinct from general unreachability so callers can
    /// show a different notice.
    #[error("bulletin for {month} is not yet published")]
    NotYetPublished {
        /// Month identifier, e.g. "2024-JAN".
        month: String,
    },

    /// The bulletin endpoint answered with a non-success status other
    /// than 404.
    #[error("bulletin endpoint unreachable (HTTP {status})")]
    Unreachable {
        /// The HTTP status code received.
        status: u16,
    },

    /// JSON serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A vulnerability record is missing a field the model cannot do
    /// without (CVE, product statuses, revision history).
    #[error("malformed vulnerability {cve}: missing {field}")]
    MalformedVulnerability {
        /// CVE of the offending record, or "<unknown>" when the CVE itself
        /// is the missing field.
        cve: String,
        /// Name of the missing field.
        field: String,
    },

    /// A revision-history timestamp could not be parsed.
    #[error("unparseable revision date '{value}' in {cve}")]
    DateParse {
        /// CVE of the record carrying the timestamp.
        cve: String,
        /// The raw timestamp string.
        value: String,
    },

    /// The join chain produced zero rows for the whole document. A valid
    /// but empty result, reported as a named condition rather than an
    /// empty table.
    #[error("no reportable data: no vulnerability had complete ratings and a remediation")]
    NoReportableData,

    /// Configuration error (missing or invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error (log files, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A specialized Result type for bulletin operations.
pub type Result<T> = std::result::Result<T, BulletinError>;

impl BulletinError {
    /// Create a new malformed-vulnerability error.
    pub fn malformed(cve: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MalformedVulnerability {
            cve: cve.into(),
            field: field.into(),
        }
    }

    /// Create a new date parse error.
    pub fn date_parse(cve: impl Into<String>, value: impl Into<String>) -> Self {
        Self::DateParse {
            cve: cve.into(),
            value: value.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True when this error means the month simply has no usable rows, as
    /// opposed to a fetch or parse failure.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::NoReportableData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_yet_published_message_names_month() {
        let err = BulletinError::NotYetPublished {
            month: "2024-JAN".to_string(),
        };
        assert!(err.to_string().contains("2024-JAN"));
        assert!(!err.is_empty_result());
    }

    #[test]
    fn no_reportable_data_is_empty_result() {
        assert!(BulletinError::NoReportableData.is_empty_result());
    }

    #[test]
    fn malformed_helper_fills_fields() {
        let err = BulletinError::malformed("CVE-2024-1234", "RevisionHistory");
        assert_eq!(
            err.to_string(),
            "malformed vulnerability CVE-2024-1234: missing RevisionHistory"
        );
    }
}
