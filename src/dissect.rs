//! Dissect templates: literal text with `%{name}` placeholders.
//!
//! A template is compiled once into a [`DissectPattern`] and matched against
//! many inputs. Matching is purely positional: each placeholder takes
//! everything up to the first occurrence of the literal that follows it, or
//! the rest of the input when it is the last token. There is no backtracking.
//!
//! Placeholder forms:
//!
//! | Form | Meaning |
//! |------|---------|
//! | `%{name}` | capture into `name` |
//! | `%{name->}` | capture, strip trailing whitespace, skip repeats of the next literal |
//! | `%{}` / `%{?name}` | consume without capturing |
//!
//! # Examples
//!
//! ```rust
//! use logparser_engine::DissectPattern;
//!
//! let pattern = DissectPattern::compile("%{hostname->} %{program}[%{pid}]: %{payload}")?;
//! let captures = pattern.dissect("fw01    sshd[812]: Accepted password").unwrap();
//! assert_eq!(
//!     captures,
//!     vec![
//!         ("hostname", "fw01"),
//!         ("program", "sshd"),
//!         ("pid", "812"),
//!         ("payload", "Accepted password"),
//!     ]
//! );
//! # Ok::<(), logparser_engine::ParserError>(())
//! ```

use crate::error::{ParserError, Result};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Placeholder {
    /// `None` for skipped placeholders.
    name: Option<String>,
    right_trim: bool,
    /// Literal that terminates this placeholder; empty only for the last one.
    suffix: String,
}

/// A compiled dissect template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DissectPattern {
    source: String,
    prefix: String,
    placeholders: Vec<Placeholder>,
}

impl DissectPattern {
    /// Compile a template string.
    ///
    /// Fails on unterminated placeholders and on two placeholders with no
    /// literal between them, since the split point would be undefined.
    pub fn compile(template: &str) -> Result<Self> {
        let mut prefix = String::new();
        let mut placeholders: Vec<Placeholder> = Vec::new();
        let mut rest = template;

        while let Some(start) = rest.find("%{") {
            let literal = &rest[..start];
            match placeholders.last_mut() {
                Some(last) => {
                    if literal.is_empty() {
                        return Err(ParserError::pattern(
                            template,
                            "adjacent placeholders need a literal between them",
                        ));
                    }
                    last.suffix = literal.to_string();
                }
                None => prefix = literal.to_string(),
            }

            let after = &rest[start + 2..];
            let end = after
                .find('}')
                .ok_or_else(|| ParserError::pattern(template, "unterminated placeholder"))?;
            placeholders.push(parse_placeholder(template, &after[..end])?);
            rest = &after[end + 1..];
        }

        match placeholders.last_mut() {
            Some(last) => last.suffix = rest.to_string(),
            None => prefix.push_str(rest),
        }

        Ok(Self {
            source: template.to_string(),
            prefix,
            placeholders,
        })
    }

    /// The template this pattern was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names of all capturing placeholders, in template order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.placeholders
            .iter()
            .filter_map(|p| p.name.as_deref())
    }

    /// Match `input`, returning `(field, value)` pairs or `None` on mismatch.
    ///
    /// Text after a trailing literal is ignored.
    pub fn dissect<'p, 'i>(&'p self, input: &'i str) -> Option<Vec<(&'p str, &'i str)>> {
        let mut pos = input.strip_prefix(self.prefix.as_str()).map(|_| self.prefix.len())?;
        let mut captures = Vec::with_capacity(self.placeholders.len());

        for placeholder in &self.placeholders {
            let remaining = &input[pos..];
            let mut value = if placeholder.suffix.is_empty() {
                pos = input.len();
                remaining
            } else {
                let idx = remaining.find(placeholder.suffix.as_str())?;
                pos += idx + placeholder.suffix.len();
                if placeholder.right_trim {
                    while input[pos..].starts_with(placeholder.suffix.as_str()) {
                        pos += placeholder.suffix.len();
                    }
                }
                &remaining[..idx]
            };

            if placeholder.right_trim {
                value = value.trim_end();
            }
            if let Some(name) = placeholder.name.as_deref() {
                captures.push((name, value));
            }
        }

        Some(captures)
    }
}

impl fmt::Display for DissectPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_placeholder(template: &str, spec: &str) -> Result<Placeholder> {
    let (spec, right_trim) = match spec.strip_suffix("->") {
        Some(stripped) => (stripped, true),
        None => (spec, false),
    };

    let name = if spec.is_empty() || spec.starts_with('?') {
        None
    } else {
        Some(spec.to_string())
    };

    if let Some(name) = &name {
        if name.contains(char::is_whitespace) || name.contains('{') {
            return Err(ParserError::pattern(
                template,
                format!("invalid field name '{name}'"),
            ));
        }
    }

    Ok(Placeholder {
        name,
        right_trim,
        suffix: String::new(),
    })
}
