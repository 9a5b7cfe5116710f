//! Positional format specifiers for dates and durations.
//!
//! A format is an ordered list of [`DatePart`]s. Formats are usually written
//! in a compact string form where `%` followed by a letter selects a
//! sub-parser and every other character is a literal:
//!
//! | Code | Sub-parser |
//! |------|------------|
//! | `%B` `%R` | month name, long or short |
//! | `%M` / `%G` | month, 2 digits / 1-2 digits |
//! | `%D` / `%F` | day, 2 digits / 1-2 digits |
//! | `%H` / `%N` `%I` | hour, 2 digits / 1-2 digits |
//! | `%T` / `%U` | minute, 2 digits / 1-2 digits |
//! | `%S` / `%O` | second, 2 digits / 1-2 digits |
//! | `%W` / `%Y` | year, 4 digits / 2 digits |
//! | `%P` `%Q` | AM/PM marker |
//! | `%Z` | `H:M:S` |
//! | `%X` | UNIX timestamp in seconds |
//! | `%z` | timezone: `Z`, `UTC`, `GMT`, `±HH:MM`, `±HHMM` |
//! | `%w` | weekday name, skipped |
//! | `%f` | fractional seconds |
//! | `%%` | literal `%` |

use crate::error::{ParserError, Result};
use serde::Deserialize;
use std::fmt;

/// Calendar component written by a numeric sub-parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl Component {
    fn max_width(self) -> usize {
        match self {
            Component::Year => 4,
            _ => 2,
        }
    }

    pub(crate) fn variable_width(self) -> (usize, usize) {
        (1, self.max_width())
    }
}

/// One positional sub-parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatePart {
    /// Exactly `n` digits.
    Fixed(Component, usize),
    /// One up to the component's natural width of digits.
    Variable(Component),
    MonthName,
    AmPm,
    Hms,
    Epoch,
    Zone,
    Weekday,
    Fraction,
    /// Literal text; whitespace inside the literal is matched loosely.
    Literal(String),
}

impl DatePart {
    pub fn literal(text: &str) -> Self {
        DatePart::Literal(text.to_string())
    }

    fn from_code(code: char) -> Option<Self> {
        use Component::*;
        let part = match code {
            'B' | 'R' => DatePart::MonthName,
            'M' => DatePart::Fixed(Month, 2),
            'G' => DatePart::Variable(Month),
            'D' => DatePart::Fixed(Day, 2),
            'F' => DatePart::Variable(Day),
            'H' => DatePart::Fixed(Hour, 2),
            'N' | 'I' => DatePart::Variable(Hour),
            'T' => DatePart::Fixed(Minute, 2),
            'U' => DatePart::Variable(Minute),
            'S' => DatePart::Fixed(Second, 2),
            'O' => DatePart::Variable(Second),
            'W' => DatePart::Fixed(Year, 4),
            'Y' => DatePart::Fixed(Year, 2),
            'P' | 'Q' => DatePart::AmPm,
            'Z' => DatePart::Hms,
            'X' => DatePart::Epoch,
            'z' => DatePart::Zone,
            'w' => DatePart::Weekday,
            'f' => DatePart::Fraction,
            _ => return None,
        };
        Some(part)
    }

    /// Whether this part can contribute to a duration.
    fn is_duration_part(&self) -> bool {
        match self {
            DatePart::Fixed(c, _) | DatePart::Variable(c) => {
                !matches!(c, Component::Year | Component::Month)
            }
            DatePart::Hms | DatePart::Literal(_) => true,
            _ => false,
        }
    }
}

/// Split a compact format string into parts.
fn compile_parts(format: &str) -> Result<Vec<DatePart>> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut chars = format.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }
        let code = chars
            .next()
            .ok_or_else(|| ParserError::date_format(format, "dangling '%'"))?;
        if code == '%' {
            literal.push('%');
            continue;
        }
        let part = DatePart::from_code(code)
            .ok_or_else(|| ParserError::date_format(format, format!("unknown code '%{code}'")))?;
        if !literal.is_empty() {
            parts.push(DatePart::Literal(std::mem::take(&mut literal)));
        }
        parts.push(part);
    }
    if !literal.is_empty() {
        parts.push(DatePart::Literal(literal));
    }
    if parts.is_empty() {
        return Err(ParserError::date_format(format, "empty format"));
    }
    Ok(parts)
}

/// A compiled calendar date format.
///
/// # Examples
///
/// ```rust
/// use logparser_engine::datetime::{Component, DateFormat, DatePart};
///
/// let compact = DateFormat::compile("%W-%M-%DT%H:%T:%S")?;
/// let explicit = DateFormat::from_parts(vec![
///     DatePart::Fixed(Component::Year, 4),
///     DatePart::literal("-"),
///     DatePart::Fixed(Component::Month, 2),
///     DatePart::literal("-"),
///     DatePart::Fixed(Component::Day, 2),
///     DatePart::literal("T"),
///     DatePart::Fixed(Component::Hour, 2),
///     DatePart::literal(":"),
///     DatePart::Fixed(Component::Minute, 2),
///     DatePart::literal(":"),
///     DatePart::Fixed(Component::Second, 2),
/// ]);
/// assert_eq!(compact.parts(), explicit.parts());
/// # Ok::<(), logparser_engine::ParserError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct DateFormat {
    source: String,
    parts: Vec<DatePart>,
}

impl DateFormat {
    pub fn compile(format: &str) -> Result<Self> {
        Ok(Self {
            source: format.to_string(),
            parts: compile_parts(format)?,
        })
    }

    pub fn from_parts(parts: Vec<DatePart>) -> Self {
        Self {
            source: describe(&parts),
            parts,
        }
    }

    pub fn parts(&self) -> &[DatePart] {
        &self.parts
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl TryFrom<String> for DateFormat {
    type Error = ParserError;

    fn try_from(value: String) -> Result<Self> {
        DateFormat::compile(&value)
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// A compiled duration format.
///
/// Only day, hour, minute, second, `H:M:S` and literal parts are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct DurationFormat {
    source: String,
    parts: Vec<DatePart>,
}

impl DurationFormat {
    pub fn compile(format: &str) -> Result<Self> {
        let parts = compile_parts(format)?;
        Self::check(format, &parts)?;
        Ok(Self {
            source: format.to_string(),
            parts,
        })
    }

    pub fn from_parts(parts: Vec<DatePart>) -> Result<Self> {
        let source = describe(&parts);
        Self::check(&source, &parts)?;
        Ok(Self { source, parts })
    }

    fn check(format: &str, parts: &[DatePart]) -> Result<()> {
        match parts.iter().find(|p| !p.is_duration_part()) {
            Some(part) => Err(ParserError::date_format(
                format,
                format!("{part:?} cannot be used in a duration"),
            )),
            None => Ok(()),
        }
    }

    pub fn parts(&self) -> &[DatePart] {
        &self.parts
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl TryFrom<String> for DurationFormat {
    type Error = ParserError;

    fn try_from(value: String) -> Result<Self> {
        DurationFormat::compile(&value)
    }
}

fn describe(parts: &[DatePart]) -> String {
    parts
        .iter()
        .map(|part| match part {
            DatePart::Literal(text) => text.replace('%', "%%"),
            other => format!("{other:?}"),
        })
        .collect()
}
