//! Error types for reconciliation.
//!
//! Remote failures are tagged explicitly so the executor can tell an absent
//! delete target apart from a real failure without probing concrete error
//! types. Each remote error carries a category that decides how the
//! executor treats it.

use std::fmt;
use thiserror::Error;

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for remote client operations.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Categories of remote errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The remote object does not exist
    NotFound,
    /// The remote object conflicts with an existing one (e.g. duplicate name)
    Conflict,
    /// Transport or server-side failure
    Network,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether a delete failing with this category can be treated as done.
    pub fn is_ignorable_on_delete(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Remote object not found",
            Self::Conflict => "Remote object conflict",
            Self::Network => "Remote request failed",
            Self::Other => "Unexpected error",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors returned by a remote client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The addressed object does not exist (HTTP 404)
    #[error("not found: {message}")]
    NotFound {
        /// Detail from the remote service
        message: String,
    },

    /// The request conflicts with existing state (HTTP 409)
    #[error("conflict: {message}")]
    Conflict {
        /// Detail from the remote service
        message: String,
    },

    /// Any other failed request
    #[error("request failed{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Request {
        /// HTTP status code if one was received
        status: Option<u16>,
        /// Detail from the transport or remote service
        message: String,
    },
}

impl RemoteError {
    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a generic request error.
    pub fn request(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Request {
            status,
            message: message.into(),
        }
    }

    /// Classify an HTTP status code into the matching variant.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => Self::NotFound { message },
            409 => Self::Conflict { message },
            _ => Self::Request {
                status: Some(status),
                message,
            },
        }
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::Request { status: None, .. } => ErrorCategory::Network,
            Self::Request {
                status: Some(code), ..
            } if *code >= 500 => ErrorCategory::Network,
            Self::Request { .. } => ErrorCategory::Other,
        }
    }

    /// Whether this error means the target is already gone.
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }
}

/// Remote operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Creating a block on the draft version
    Create,
    /// Deleting a block from the draft version
    Delete,
    /// Listing the blocks of a version
    List,
    /// Fetching a single entity of a version
    Get,
    /// Replacing an entity in place, such as a package upload
    Update,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::List => "list",
            Self::Get => "get",
            Self::Update => "update",
        };
        write!(f, "{name}")
    }
}

/// Errors that abort a reconciliation or read.
#[derive(Debug, Error)]
pub enum Error {
    /// A remote call failed fatally.
    #[error(
        "failed to {operation} {kind}{} for service {service_id}, version {version}: {source}",
        .key.as_ref().map(|k| format!(" \"{k}\"")).unwrap_or_default()
    )]
    Remote {
        /// Block kind label (e.g. "ACL")
        kind: &'static str,
        /// Operation that failed
        operation: Operation,
        /// Remote service identifier
        service_id: String,
        /// Service version number
        version: u32,
        /// Entity key, when the operation addressed one entity
        key: Option<String>,
        /// Underlying remote error
        #[source]
        source: RemoteError,
    },
}

impl Error {
    /// Wrap a remote error with its call context.
    pub fn remote(
        kind: &'static str,
        operation: Operation,
        version: &crate::ServiceVersion,
        key: Option<String>,
        source: RemoteError,
    ) -> Self {
        Self::Remote {
            kind,
            operation,
            service_id: version.service_id.clone(),
            version: version.number,
            key,
            source,
        }
    }

    /// Get the category of the underlying remote error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Remote { source, .. } => source.category(),
        }
    }

    /// The underlying remote error.
    pub fn remote_error(&self) -> &RemoteError {
        match self {
            Self::Remote { source, .. } => source,
        }
    }

    /// The operation that failed.
    pub fn operation(&self) -> Operation {
        match self {
            Self::Remote { operation, .. } => *operation,
        }
    }
}
