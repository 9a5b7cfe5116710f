//! Format-driven date and duration parsing.
//!
//! Vendor tables describe timestamps as lists of candidate formats. Each
//! format is a sequence of positional sub-parsers that advance a cursor and
//! fill an accumulator; the first format whose every sub-parser succeeds
//! produces the result.
//!
//! - [`format`] - sub-parsers and the compact `%X` format syntax
//! - [`parser`] - format evaluation, year inference and durations

pub mod format;
pub mod parser;

pub use format::{Component, DateFormat, DatePart, DurationFormat};
pub use parser::{expand_two_digit_year, parse_date, parse_duration};
