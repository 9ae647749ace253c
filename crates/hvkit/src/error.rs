//! Error types for file reconciliation.
//!
//! Errors are categorized so callers can tell a local mistake (bad
//! arguments, caught before any remote call) from a host that could not be
//! reached, a script that failed on the host, and output that could not be
//! understood. Nothing in this crate retries; every error surfaces as-is.

use thiserror::Error;

/// Categories of reconciliation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A required argument was missing
    Validation,
    /// An argument could not be rendered into a script
    Render,
    /// The host could not be reached or the channel failed
    Transport,
    /// The script ran and reported a failure
    RemoteScript,
    /// The script output did not have the expected shape
    Decode,
}

impl ErrorCategory {
    /// Short name of the category.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Validation => "ValidationError",
            Self::Render => "TemplateRenderError",
            Self::Transport => "TransportError",
            Self::RemoteScript => "RemoteScriptError",
            Self::Decode => "DecodeError",
        }
    }

    /// Whether errors of this category are raised before contacting the host.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Validation | Self::Render)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Validation => "Missing required argument",
            Self::Render => "Argument cannot be embedded in a script",
            Self::Transport => "Host unreachable",
            Self::RemoteScript => "Script failed on the host",
            Self::Decode => "Unexpected script output",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Validation => "Provide every required argument",
            Self::Render => "Remove line breaks and control characters from the value",
            Self::Transport => "Check the connection settings in the [host] config section",
            Self::RemoteScript => "Inspect the script error output and the path on the host",
            Self::Decode => "Check the host's PowerShell version and profile output",
        }
    }
}

/// Errors that can occur while reconciling a file resource.
#[derive(Debug, Error)]
pub enum Error {
    /// A required argument was missing or empty
    #[error("{operation}: {field} argument is required")]
    Validation {
        /// Operation that was refused
        operation: &'static str,
        /// The missing argument
        field: &'static str,
    },

    /// Script rendering failed
    #[error(transparent)]
    Render(#[from] psscript::Error),

    /// The host could not be reached or the execution channel failed
    #[error("transport error: {message}")]
    Transport {
        /// What went wrong
        message: String,
    },

    /// The script ran but failed
    #[error("remote script failed: {message}")]
    RemoteScript {
        /// What went wrong
        message: String,
        /// Exit code reported by the host, if any
        exit_code: Option<i32>,
        /// Standard error captured from the script
        stderr: String,
    },

    /// The script output could not be decoded
    #[error("cannot decode script output: {message}")]
    Decode {
        /// What went wrong
        message: String,
        /// The raw output that failed to decode
        output: String,
    },
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Validation { .. } => ErrorCategory::Validation,
            Error::Render(_) => ErrorCategory::Render,
            Error::Transport { .. } => ErrorCategory::Transport,
            Error::RemoteScript { .. } => ErrorCategory::RemoteScript,
            Error::Decode { .. } => ErrorCategory::Decode,
        }
    }

    /// Whether this error was raised before any remote call.
    pub fn is_local(&self) -> bool {
        self.category().is_local()
    }

    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Error::Transport {
            message: message.into(),
        }
    }

    pub(crate) fn decode(message: impl Into<String>, output: &str) -> Self {
        Error::Decode {
            message: message.into(),
            output: output.to_string(),
        }
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;
