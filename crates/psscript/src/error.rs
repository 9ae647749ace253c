//! Error types for script rendering.
//!
//! Every error here is raised before a script leaves the process, so none
//! of them can have touched a remote host.

use thiserror::Error;

/// Errors that can occur while rendering a script template.
#[derive(Debug, Error)]
pub enum Error {
    /// A required argument was empty
    #[error("{template}: required argument '{field}' is empty")]
    MissingArgument {
        /// Template being rendered
        template: &'static str,
        /// Name of the empty argument
        field: &'static str,
    },

    /// An argument cannot be embedded in a single-quoted literal
    #[error("{template}: argument '{field}' cannot be embedded safely: {reason}")]
    UnsafeValue {
        /// Template being rendered
        template: &'static str,
        /// Name of the offending argument
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// Unknown template name
    #[error("unknown script template: {0}")]
    UnknownTemplate(String),

    /// A template body failed to compile
    #[error("template error: {0}")]
    Template(#[from] Box<handlebars::TemplateError>),

    /// The template engine failed while rendering
    #[error("render error: {0}")]
    Render(#[from] handlebars::RenderError),
}

impl From<handlebars::TemplateError> for Error {
    fn from(err: handlebars::TemplateError) -> Self {
        Self::Template(Box::new(err))
    }
}

/// Result type for script rendering.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_template_and_field() {
        let err = Error::MissingArgument {
            template: "GetFile",
            field: "path",
        };
        assert_eq!(err.to_string(), "GetFile: required argument 'path' is empty");

        let err = Error::UnsafeValue {
            template: "DeleteFile",
            field: "path",
            reason: "contains a line feed".to_string(),
        };
        assert!(err.to_string().contains("DeleteFile"));
        assert!(err.to_string().contains("line feed"));
    }
}
