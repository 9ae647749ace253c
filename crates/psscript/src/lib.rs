//! # psscript
//!
//! Typed PowerShell script templates for managing files on a Hyper-V host.
//!
//! A [`Registry`] holds the named templates. Rendering takes a
//! [`TemplateArgs`] value, validates every field, and substitutes each one
//! into a single-quoted PowerShell literal with quotes doubled, so no
//! argument can end its literal early. Rendering is a pure function of its
//! arguments.
//!
//! ## Example
//!
//! ```
//! use psscript::{Registry, TemplateArgs, TemplateId};
//!
//! let registry = Registry::new().unwrap();
//! let script = registry
//!     .render(&TemplateArgs::get(r"C:\vm\it's here.iso"))
//!     .unwrap();
//!
//! assert_eq!(script.template(), TemplateId::GetFile);
//! assert!(script.body().contains(r"$path = 'C:\vm\it''s here.iso'"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod escape;
pub mod templates;

pub use error::{Error, Result};
pub use templates::{TemplateArgs, TemplateId};

use handlebars::Handlebars;
use serde_json::{Map, Value};

/// A rendered script, ready to be handed to an executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    template: TemplateId,
    body: String,
}

impl Script {
    /// The template this script was rendered from.
    pub fn template(&self) -> TemplateId {
        self.template
    }

    /// The script text.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Read back the value assigned to `$name` by the template preamble.
    ///
    /// Only the single-quoted argument assignments written by the
    /// templates are recognised.
    pub fn variable(&self, name: &str) -> Option<String> {
        let prefix = format!("${name} = ");
        self.body
            .lines()
            .find_map(|line| line.strip_prefix(&prefix))
            .and_then(escape::unquote)
    }

    /// Consume the script, returning its text.
    pub fn into_body(self) -> String {
        self.body
    }
}

/// Registry of the compiled script templates.
pub struct Registry {
    handlebars: Handlebars<'static>,
}

impl Registry {
    /// Compile every template in [`TemplateId::ALL`].
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(escape::single_quoted);

        for id in TemplateId::ALL {
            handlebars.register_template_string(id.name(), id.body())?;
        }

        Ok(Self { handlebars })
    }

    /// Whether a template is registered.
    pub fn has_template(&self, id: TemplateId) -> bool {
        self.handlebars.has_template(id.name())
    }

    /// Render a template with its arguments.
    ///
    /// Fails with [`Error::MissingArgument`] or [`Error::UnsafeValue`]
    /// before any substitution happens.
    pub fn render(&self, args: &TemplateArgs) -> Result<Script> {
        args.validate()?;

        let template = args.template_id();
        let context: Map<String, Value> = args
            .fields()
            .into_iter()
            .map(|(field, value)| (field.to_string(), Value::String(value.to_string())))
            .collect();

        let body = self.handlebars.render(template.name(), &context)?;
        log::trace!("Rendered {template} ({} bytes)", body.len());

        Ok(Script { template, body })
    }
}

/// Whether `source` names an http or https resource.
///
/// Decided by scheme inspection alone; the host is never contacted.
pub fn is_http_uri(source: &str) -> bool {
    let Some((scheme, rest)) = source.split_once("://") else {
        return false;
    };

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    (scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https"))
        && !authority.is_empty()
}
