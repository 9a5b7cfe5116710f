//! Built-in functions callable from a message's action list.
//!
//! Vendor tables name functions by upper-case identifier. A handful are
//! implemented here; any other well-formed name compiles to
//! [`CallFunction::Unimplemented`], which records an entry in the record's
//! `error.message` list instead of aborting the record.

use crate::bag::FieldValue;
use crate::error::{ParserError, Result};
use crate::normalize::convert::{to_ip, to_long};
use crate::normalize::url::{Url, UrlComponent};
use std::fmt;
use std::net::Ipv6Addr;

/// A function invoked by a `call` action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallFunction {
    /// Concatenate every present argument.
    Strcat,
    /// Remove one pair of surrounding quotes.
    Rmq,
    /// Integer arithmetic: `lhs op rhs` with `+ - * / %`.
    Calc,
    /// Traffic direction between a source and a destination address.
    Dirchk,
    /// One component of a URL: `URL(component, url)`.
    Url,
    /// Declared by a table but not provided by this runtime.
    Unimplemented(String),
}

impl CallFunction {
    /// Resolve a function name from a rule table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use logparser_engine::matcher::CallFunction;
    ///
    /// assert_eq!(CallFunction::from_name("STRCAT").unwrap(), CallFunction::Strcat);
    /// assert_eq!(
    ///     CallFunction::from_name("PARMVAL").unwrap(),
    ///     CallFunction::Unimplemented("PARMVAL".to_string())
    /// );
    /// assert!(CallFunction::from_name("not a name").is_err());
    /// ```
    pub fn from_name(name: &str) -> Result<Self> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(ParserError::UnknownFunction(name.to_string()));
        }
        Ok(match name.to_ascii_uppercase().as_str() {
            "STRCAT" => CallFunction::Strcat,
            "RMQ" => CallFunction::Rmq,
            "CALC" => CallFunction::Calc,
            "DIRCHK" => CallFunction::Dirchk,
            "URL" => CallFunction::Url,
            _ => CallFunction::Unimplemented(name.to_string()),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            CallFunction::Strcat => "STRCAT",
            CallFunction::Rmq => "RMQ",
            CallFunction::Calc => "CALC",
            CallFunction::Dirchk => "DIRCHK",
            CallFunction::Url => "URL",
            CallFunction::Unimplemented(name) => name,
        }
    }

    /// Reject argument counts the function can never accept.
    pub fn check_arity(&self, count: usize) -> Result<()> {
        let ok = match self {
            CallFunction::Strcat => count >= 1,
            CallFunction::Rmq => count == 1,
            CallFunction::Calc => count == 3,
            CallFunction::Dirchk => count == 2,
            CallFunction::Url => count == 2,
            CallFunction::Unimplemented(_) => true,
        };
        if ok {
            Ok(())
        } else {
            Err(ParserError::CompilationError(format!(
                "{} does not accept {} argument(s)",
                self.name(),
                count
            )))
        }
    }

    /// Evaluate on resolved arguments; `None` entries are unset fields.
    ///
    /// Returns `None` when no value should be written. Unimplemented functions
    /// always return `None`; the caller reports them.
    pub fn evaluate(&self, args: &[Option<String>]) -> Option<FieldValue> {
        match self {
            CallFunction::Strcat => {
                let joined: String = args.iter().flatten().map(String::as_str).collect();
                Some(FieldValue::Str(joined))
            }
            CallFunction::Rmq => {
                let value = args.first()?.as_deref()?;
                Some(FieldValue::Str(remove_quotes(value).to_string()))
            }
            CallFunction::Calc => {
                let lhs = to_long(args.first()?.as_deref()?)?;
                let op = args.get(1)?.as_deref()?.trim();
                let rhs = to_long(args.get(2)?.as_deref()?)?;
                calc(lhs, op, rhs).map(FieldValue::Int)
            }
            CallFunction::Dirchk => {
                let source = args.first()?.as_deref()?;
                let destination = args.get(1)?.as_deref()?;
                direction(source, destination).map(|d| FieldValue::Str(d.to_string()))
            }
            CallFunction::Url => {
                let component = UrlComponent::from_name(args.first()?.as_deref()?)?;
                Url::parse(args.get(1)?.as_deref()?)?.component(component)
            }
            CallFunction::Unimplemented(_) => None,
        }
    }
}

impl fmt::Display for CallFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn remove_quotes(value: &str) -> &str {
    let trimmed = value.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return &trimmed[1..trimmed.len() - 1];
        }
    }
    trimmed
}

fn calc(lhs: i64, op: &str, rhs: i64) -> Option<i64> {
    match op {
        "+" => lhs.checked_add(rhs),
        "-" => lhs.checked_sub(rhs),
        "*" => lhs.checked_mul(rhs),
        "/" => lhs.checked_div(rhs),
        "%" => lhs.checked_rem(rhs),
        _ => None,
    }
}

/// Classify traffic by whether each end sits in private address space.
fn direction(source: &str, destination: &str) -> Option<&'static str> {
    let source_private = is_private(&to_ip(source)?)?;
    let destination_private = is_private(&to_ip(destination)?)?;
    Some(match (source_private, destination_private) {
        (true, true) => "internal",
        (true, false) => "outbound",
        (false, true) => "inbound",
        (false, false) => "external",
    })
}

fn is_private(address: &str) -> Option<bool> {
    if address.contains(':') {
        let ip: Ipv6Addr = address.parse().ok()?;
        let first = ip.segments()[0];
        return Some(
            ip.is_loopback() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80,
        );
    }
    let octets: Vec<u8> = address
        .split('.')
        .map(|octet| octet.parse().ok())
        .collect::<Option<_>>()?;
    Some(match octets.as_slice() {
        [10, ..] | [127, ..] => true,
        [172, b, ..] => (16..=31).contains(b),
        [192, 168, ..] => true,
        [169, 254, ..] => true,
        _ => false,
    })
}
