//! Embedding values inside PowerShell single-quoted string literals.
//!
//! Inside `'...'` PowerShell performs no variable expansion and no escape
//! processing, so the only way to terminate the literal early is a quote
//! character. PowerShell treats the typographic single quotes as quotes
//! too, and a doubled quote of any of these kinds stands for one literal quote.

use crate::error::{Error, Result};

/// Characters PowerShell accepts as a single-quote delimiter.
pub const SINGLE_QUOTES: [char; 5] = ['\'', '\u{2018}', '\u{2019}', '\u{201A}', '\u{201B}'];

/// Check whether a character terminates a single-quoted literal.
pub fn is_single_quote(c: char) -> bool {
    SINGLE_QUOTES.contains(&c)
}

/// Escape a value for use between `'` delimiters.
///
/// Every quote character is doubled; everything else passes through
/// unchanged (backslashes, `$`, `;` and backticks are inert inside
/// single quotes).
pub fn single_quoted(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        if is_single_quote(c) {
            escaped.push(c);
        }
        escaped.push(c);
    }
    escaped
}

/// Parse a complete `'...'` literal back into its value.
///
/// Returns `None` if the input is not exactly one well-formed literal.
pub fn unquote(literal: &str) -> Option<String> {
    let mut chars = literal.chars().peekable();
    if !chars.next().is_some_and(is_single_quote) {
        return None;
    }

    let mut value = String::new();
    while let Some(c) = chars.next() {
        if is_single_quote(c) {
            match chars.peek() {
                Some(&next) if is_single_quote(next) => {
                    value.push(c);
                    chars.next();
                }
                // closing quote must be the last character
                _ => return chars.next().is_none().then_some(value),
            }
        } else {
            value.push(c);
        }
    }
    None
}

/// Validate an argument before it is rendered.
///
/// Rejects empty values and values carrying control characters: a line
/// break or NUL would leave the literal on a different line than the
/// assignment it belongs to, which no escaping can repair.
pub fn check(template: &'static str, field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::MissingArgument { template, field });
    }

    if let Some(c) = value.chars().find(|c| c.is_control()) {
        return Err(Error::UnsafeValue {
            template,
            field,
            reason: format!("contains control character U+{:04X}", u32::from(c)),
        });
    }

    Ok(())
}
