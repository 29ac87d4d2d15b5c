//! Error types for schema reconciliation.
//!
//! Errors are categorized so callers can tell a transient blip (retried
//! locally) from a conflict or a consistency timeout (safe to re-invoke
//! `apply`) and from a permanent failure (fix the input or credentials).

use crate::types::SchemaScope;
use std::fmt;

/// Result type alias for schema operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of reconciliation errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network blip, 5xx, throttling. Retried locally with backoff.
    Transient,
    /// The remote document changed shape underneath the write.
    Conflict,
    /// Authorization failure, unknown scope, rejected payload.
    Permanent,
    /// Malformed desired state supplied by the caller.
    Invalid,
    /// The write was accepted but never became visible while polling.
    ConsistencyTimeout,
    /// The caller's deadline expired.
    Timeout,
    /// A property required to exist was absent.
    NotFound,
    /// The remote document could not be decoded.
    Codec,
}

impl ErrorCategory {
    /// Whether the operation is retried locally with backoff.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }

    /// Whether the caller may simply re-invoke the whole operation.
    ///
    /// `apply` always re-reads current state first, so re-invoking it after
    /// any of these is safe.
    #[must_use]
    pub fn is_reinvocable(&self) -> bool {
        matches!(
            self,
            Self::Transient | Self::Conflict | Self::ConsistencyTimeout | Self::Timeout
        )
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Transient => "Transient remote failure",
            Self::Conflict => "Concurrent schema modification",
            Self::Permanent => "Remote rejected the request",
            Self::Invalid => "Invalid property definition",
            Self::ConsistencyTimeout => "Write not yet visible",
            Self::Timeout => "Operation timed out",
            Self::NotFound => "Property not found",
            Self::Codec => "Malformed schema document",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Transient => "Check connectivity to the directory service and try again",
            Self::Conflict => "Re-run apply; it re-reads the current schema first",
            Self::Permanent => "Check the API token, org URL and user type",
            Self::Invalid => "Fix the property definition in your configuration",
            Self::ConsistencyTimeout => {
                "The write may have succeeded; look the property up before retrying"
            }
            Self::Timeout => "Raise the timeout or reduce parallel writes to the same user type",
            Self::NotFound => "Verify the property index and user type",
            Self::Codec => "The service returned an unexpected schema shape",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Failure reported by a [`RemoteSchemaClient`](crate::backend::RemoteSchemaClient).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Retryable failure (transport error, throttling, 5xx).
    #[error("transient failure: {message}")]
    Transient {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// The service reported a conflicting concurrent modification.
    #[error("conflict: {message}")]
    Conflict {
        /// Error message.
        message: String,
    },

    /// Non-retryable failure.
    #[error("{message}")]
    Permanent {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },
}

impl RemoteError {
    /// Create a transient error without a status code.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            status: None,
        }
    }

    /// Create a permanent error without a status code.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
            status: None,
        }
    }

    /// Classify an HTTP status code.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            409 | 412 => Self::Conflict { message },
            429 | 500..=599 => Self::Transient {
                message,
                status: Some(status),
            },
            _ => Self::Permanent {
                message,
                status: Some(status),
            },
        }
    }

    /// Whether this failure is worth retrying locally.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// HTTP status code if the failure came from a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transient { status, .. } | Self::Permanent { status, .. } => *status,
            Self::Conflict { .. } => None,
        }
    }
}

impl From<ureq::Error> for RemoteError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::from_status(code, format!("HTTP {code}")),
            ureq::Error::Json(e) => Self::permanent(format!("invalid response body: {e}")),
            ureq::Error::BadUri(uri) => Self::permanent(format!("invalid URL: {uri}")),
            other => Self::transient(other.to_string()),
        }
    }
}

/// Errors that can occur while reconciling or importing schema properties.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A remote call failed.
    #[error("{operation} of schema for {} failed: {source}", target(.scope, .index.as_deref()))]
    Remote {
        /// Which step failed (`fetch`, `replace`, `poll`).
        operation: &'static str,
        /// Scope under operation.
        scope: SchemaScope,
        /// Property under operation, if any.
        index: Option<String>,
        /// Underlying failure.
        source: RemoteError,
    },

    /// The desired property is malformed.
    #[error("invalid property '{index}': {message}")]
    InvalidProperty {
        /// Property index (may be empty when the index itself is missing).
        index: String,
        /// What is wrong with it.
        message: String,
    },

    /// Polling never observed the written state.
    #[error(
        "property '{index}' in {scope} did not converge after {attempts} reads; the write may still have succeeded"
    )]
    ConsistencyTimeout {
        /// Scope under operation.
        scope: SchemaScope,
        /// Property under operation.
        index: String,
        /// Number of reads performed.
        attempts: u32,
    },

    /// The caller's deadline expired.
    #[error("timed out during {stage} for {}", target(.scope, .index.as_deref()))]
    Timeout {
        /// Scope under operation.
        scope: SchemaScope,
        /// Property under operation, if known.
        index: Option<String>,
        /// Step that was in progress (`lock`, `fetch`, `poll`).
        stage: &'static str,
    },

    /// A property that must exist is absent.
    #[error("property '{index}' not found in {scope}")]
    NotFound {
        /// Scope searched.
        scope: SchemaScope,
        /// Missing property index.
        index: String,
    },

    /// The remote document could not be decoded.
    #[error("malformed schema document for {scope}: {message}")]
    Codec {
        /// Scope of the document.
        scope: SchemaScope,
        /// What is wrong with it.
        message: String,
    },

    /// An import identifier could not be parsed.
    #[error("invalid import id '{0}': expected '<index>' or '<user type>.<index>'")]
    InvalidImportId(String),
}

fn target(scope: &SchemaScope, index: Option<&str>) -> String {
    match index {
        Some(index) => format!("'{index}' in {scope}"),
        None => scope.to_string(),
    }
}

impl Error {
    /// Wrap a remote failure with the scope and index under operation.
    pub fn remote(
        operation: &'static str,
        scope: &SchemaScope,
        index: Option<&str>,
        source: RemoteError,
    ) -> Self {
        Self::Remote {
            operation,
            scope: scope.clone(),
            index: index.map(str::to_string),
            source,
        }
    }

    /// Create an invalid-property error.
    pub fn invalid(index: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidProperty {
            index: index.into(),
            message: message.into(),
        }
    }

    /// Get the error category for retry logic.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Remote { source, .. } => match source {
                RemoteError::Transient { .. } => ErrorCategory::Transient,
                RemoteError::Conflict { .. } => ErrorCategory::Conflict,
                RemoteError::Permanent { .. } => ErrorCategory::Permanent,
            },
            Self::InvalidProperty { .. } | Self::InvalidImportId(_) => ErrorCategory::Invalid,
            Self::ConsistencyTimeout { .. } => ErrorCategory::ConsistencyTimeout,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Codec { .. } => ErrorCategory::Codec,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Convert a remote failure into a timeout for the same target.
    ///
    /// Used when the deadline leaves no room for another attempt.
    #[must_use]
    pub fn into_timeout(self) -> Self {
        match self {
            Self::Remote {
                operation,
                scope,
                index,
                ..
            } => Self::Timeout {
                scope,
                index,
                stage: operation,
            },
            other => other,
        }
    }

    /// Attach the property index to errors raised before it was known.
    #[must_use]
    pub fn with_index(self, property: &str) -> Self {
        match self {
            Self::Timeout {
                scope,
                index: None,
                stage,
            } => Self::Timeout {
                scope,
                index: Some(property.to_string()),
                stage,
            },
            Self::Remote {
                operation,
                scope,
                index: None,
                source,
            } => Self::Remote {
                operation,
                scope,
                index: Some(property.to_string()),
                source,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(RemoteError::from_status(503, "unavailable").is_transient());
        assert!(RemoteError::from_status(429, "slow down").is_transient());
        assert!(matches!(
            RemoteError::from_status(409, "changed"),
            RemoteError::Conflict { .. }
        ));
        assert!(matches!(
            RemoteError::from_status(403, "forbidden"),
            RemoteError::Permanent {
                status: Some(403),
                ..
            }
        ));
        assert_eq!(RemoteError::from_status(404, "missing").status(), Some(404));
    }

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::Transient.is_retryable());
        assert!(!ErrorCategory::Conflict.is_retryable());
        assert!(!ErrorCategory::Permanent.is_retryable());
        assert!(!ErrorCategory::ConsistencyTimeout.is_retryable());
    }

    #[test]
    fn test_error_category_reinvocable() {
        assert!(ErrorCategory::Conflict.is_reinvocable());
        assert!(ErrorCategory::ConsistencyTimeout.is_reinvocable());
        assert!(!ErrorCategory::Permanent.is_reinvocable());
        assert!(!ErrorCategory::Invalid.is_reinvocable());
    }

    #[test]
    fn test_remote_error_carries_scope_and_index() {
        let err = Error::remote(
            "fetch",
            &SchemaScope::custom("oty123"),
            Some("login"),
            RemoteError::transient("connection reset"),
        );
        let msg = err.to_string();
        assert!(msg.contains("oty123"));
        assert!(msg.contains("login"));
        assert!(msg.contains("connection reset"));
        assert_eq!(err.category(), ErrorCategory::Transient);
    }

    #[test]
    fn test_into_timeout_keeps_target() {
        let err = Error::remote(
            "fetch",
            &SchemaScope::Default,
            Some("email"),
            RemoteError::transient("reset"),
        )
        .into_timeout();
        match err {
            Error::Timeout {
                scope,
                index,
                stage,
            } => {
                assert_eq!(scope, SchemaScope::Default);
                assert_eq!(index.as_deref(), Some("email"));
                assert_eq!(stage, "fetch");
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_with_index_fills_missing_index_only() {
        let err = Error::Timeout {
            scope: SchemaScope::Default,
            index: None,
            stage: "lock",
        }
        .with_index("login");
        assert!(err.to_string().contains("'login'"));

        let err = Error::NotFound {
            scope: SchemaScope::Default,
            index: "a".into(),
        }
        .with_index("b");
        assert!(err.to_string().contains("'a'"));
    }
}
