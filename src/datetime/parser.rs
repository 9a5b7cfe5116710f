//! Date and duration parsing against ordered format lists.

use super::format::{Component, DateFormat, DatePart, DurationFormat};
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc,
};

/// Dates without a year may lie at most this far in the future.
const FUTURE_TOLERANCE_DAYS: i64 = 2;

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Components collected during one format attempt.
#[derive(Debug, Default, Clone)]
struct DateAccumulator {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    hour: Option<u32>,
    minute: Option<u32>,
    second: Option<u32>,
    nanos: u32,
    pm: Option<bool>,
    epoch: Option<i64>,
    offset: Option<FixedOffset>,
}

impl DateAccumulator {
    fn set(&mut self, component: Component, value: i64, digits: usize) -> bool {
        let in_range = |lo: i64, hi: i64| (lo..=hi).contains(&value);
        match component {
            Component::Year => {
                if digits <= 2 {
                    self.year = Some(expand_two_digit_year(value as i32));
                } else if in_range(1000, 9999) {
                    self.year = Some(value as i32);
                } else {
                    return false;
                }
            }
            Component::Month if in_range(1, 12) => self.month = Some(value as u32),
            Component::Day if in_range(1, 31) => self.day = Some(value as u32),
            Component::Hour if in_range(0, 23) => self.hour = Some(value as u32),
            Component::Minute if in_range(0, 59) => self.minute = Some(value as u32),
            Component::Second if in_range(0, 60) => self.second = Some(value as u32),
            _ => return false,
        }
        true
    }

    /// Turn the collected components into an instant.
    fn resolve(&self, default_offset: FixedOffset, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if let Some(epoch) = self.epoch {
            return Utc.timestamp_opt(epoch, self.nanos).single();
        }

        let offset = self.offset.unwrap_or(default_offset);
        let local_now = now.with_timezone(&offset);
        let month = self.month.unwrap_or_else(|| local_now.month());
        let day = self.day.unwrap_or_else(|| local_now.day());
        let time = self.time()?;

        match self.year {
            Some(year) => build(year, month, day, time, offset),
            None => {
                let year = local_now.year();
                let candidate = build(year, month, day, time, offset);
                match candidate {
                    Some(date) if date > now + Duration::days(FUTURE_TOLERANCE_DAYS) => {
                        build(year - 1, month, day, time, offset)
                    }
                    Some(date) => Some(date),
                    // Feb 29 of a non-leap current year may belong to last year.
                    None => build(year - 1, month, day, time, offset),
                }
            }
        }
    }

    fn time(&self) -> Option<NaiveTime> {
        let mut hour = self.hour.unwrap_or(0);
        match self.pm {
            Some(true) if hour < 12 => hour += 12,
            Some(false) if hour == 12 => hour = 0,
            _ => {}
        }
        let minute = self.minute.unwrap_or(0);
        match self.second.unwrap_or(0) {
            60 => NaiveTime::from_hms_nano_opt(hour, minute, 59, 1_000_000_000 + self.nanos),
            second => NaiveTime::from_hms_nano_opt(hour, minute, second, self.nanos),
        }
    }
}

fn build(
    year: i32,
    month: u32,
    day: u32,
    time: NaiveTime,
    offset: FixedOffset,
) -> Option<DateTime<Utc>> {
    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_time(time);
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|date| date.with_timezone(&Utc))
}

/// Two-digit years: 70-99 map to 1970-1999, 00-69 to 2000-2069.
pub fn expand_two_digit_year(value: i32) -> i32 {
    if value >= 70 {
        1900 + value
    } else {
        2000 + value
    }
}

/// Read between `min` and `max` ASCII digits at `pos`.
fn read_digits(input: &str, pos: usize, min: usize, max: usize) -> Option<(i64, usize)> {
    let digits = input[pos..]
        .bytes()
        .take(max)
        .take_while(u8::is_ascii_digit)
        .count();
    if digits < min {
        return None;
    }
    let value = input[pos..pos + digits].parse().ok()?;
    Some((value, digits))
}

fn skip_whitespace(input: &str, pos: usize) -> usize {
    let rest = &input[pos..];
    pos + (rest.len() - rest.trim_start().len())
}

/// Match a literal, tolerating differences in surrounding whitespace.
fn match_literal(input: &str, pos: usize, literal: &str) -> Option<usize> {
    let trailing_space = literal.ends_with(char::is_whitespace);
    if input[pos..].starts_with(literal) {
        let end = pos + literal.len();
        return Some(if trailing_space {
            skip_whitespace(input, end)
        } else {
            end
        });
    }
    let start = skip_whitespace(input, pos);
    let core = literal.trim();
    if core.is_empty() {
        return (start > pos).then_some(start);
    }
    if !input[start..].starts_with(core) {
        return None;
    }
    let end = start + core.len();
    if trailing_space {
        Some(skip_whitespace(input, end))
    } else {
        Some(end)
    }
}

/// Case-insensitive match of a long name or its three-letter abbreviation.
fn match_name(input: &str, pos: usize, names: &[&str]) -> Option<(usize, usize)> {
    let rest = &input[pos..];
    let starts_with_ci = |prefix: &str| {
        rest.len() >= prefix.len()
            && rest.is_char_boundary(prefix.len())
            && rest[..prefix.len()].eq_ignore_ascii_case(prefix)
    };
    for (index, name) in names.iter().enumerate() {
        if starts_with_ci(name) {
            return Some((index, pos + name.len()));
        }
    }
    names
        .iter()
        .enumerate()
        .find(|(_, name)| starts_with_ci(&name[..3]))
        .map(|(index, _)| (index, pos + 3))
}

fn match_zone(input: &str, pos: usize) -> Option<(FixedOffset, usize)> {
    let rest = &input[pos..];
    let utc = FixedOffset::east_opt(0)?;
    for name in ["UTC", "GMT"] {
        if rest.starts_with(name) {
            return Some((utc, pos + name.len()));
        }
    }
    if rest.starts_with('Z') {
        return Some((utc, pos + 1));
    }

    let sign = match rest.chars().next()? {
        '+' => 1,
        '-' => -1,
        _ => return None,
    };
    let mut cursor = pos + 1;
    let (hours, _) = read_digits(input, cursor, 2, 2)?;
    cursor += 2;
    if input[cursor..].starts_with(':') {
        cursor += 1;
    }
    let minutes = match read_digits(input, cursor, 2, 2) {
        Some((minutes, _)) => {
            cursor += 2;
            minutes
        }
        None => 0,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    let offset = FixedOffset::east_opt(sign * (hours as i32 * 3600 + minutes as i32 * 60))?;
    Some((offset, cursor))
}

/// `H:M:S` with one or two digits per field.
fn match_hms(input: &str, pos: usize) -> Option<([i64; 3], usize)> {
    let mut values = [0i64; 3];
    let mut cursor = pos;
    for (index, slot) in values.iter_mut().enumerate() {
        if index > 0 {
            cursor = input[cursor..].starts_with(':').then_some(cursor + 1)?;
        }
        let (value, digits) = read_digits(input, cursor, 1, 2)?;
        *slot = value;
        cursor += digits;
    }
    Some((values, cursor))
}

fn apply_date_part(
    part: &DatePart,
    input: &str,
    pos: usize,
    acc: &mut DateAccumulator,
) -> Option<usize> {
    match part {
        DatePart::Fixed(component, width) => {
            let (value, digits) = read_digits(input, pos, *width, *width)?;
            acc.set(*component, value, digits).then_some(pos + digits)
        }
        DatePart::Variable(component) => {
            let (min, max) = component.variable_width();
            let (value, digits) = read_digits(input, pos, min, max)?;
            acc.set(*component, value, digits).then_some(pos + digits)
        }
        DatePart::MonthName => {
            let (index, next) = match_name(input, pos, &MONTHS)?;
            acc.month = Some(index as u32 + 1);
            Some(next)
        }
        DatePart::Weekday => match_name(input, pos, &WEEKDAYS).map(|(_, next)| next),
        DatePart::AmPm => {
            let rest = input.get(pos..pos + 2)?;
            let pm = if rest.eq_ignore_ascii_case("am") {
                false
            } else if rest.eq_ignore_ascii_case("pm") {
                true
            } else {
                return None;
            };
            acc.pm = Some(pm);
            Some(pos + 2)
        }
        DatePart::Hms => {
            let ([h, m, s], next) = match_hms(input, pos)?;
            let ok = acc.set(Component::Hour, h, 2)
                && acc.set(Component::Minute, m, 2)
                && acc.set(Component::Second, s, 2);
            ok.then_some(next)
        }
        DatePart::Epoch => {
            let (value, digits) = read_digits(input, pos, 1, 11)?;
            acc.epoch = Some(value);
            Some(pos + digits)
        }
        DatePart::Zone => {
            let (offset, next) = match_zone(input, pos)?;
            acc.offset = Some(offset);
            Some(next)
        }
        DatePart::Fraction => {
            let (value, digits) = read_digits(input, pos, 1, 9)?;
            acc.nanos = (value as u32) * 10u32.pow(9 - digits as u32);
            Some(pos + digits)
        }
        DatePart::Literal(text) => match_literal(input, pos, text),
    }
}

fn try_date_format(
    format: &DateFormat,
    input: &str,
    default_offset: FixedOffset,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let mut acc = DateAccumulator::default();
    let mut pos = 0;
    for part in format.parts() {
        pos = apply_date_part(part, input, pos, &mut acc)?;
    }
    acc.resolve(default_offset, now)
}

/// Parse `input` with the first format that fits.
///
/// `default_offset` applies unless the input carries its own zone; `now`
/// anchors year inference for dates that carry no year.
///
/// # Examples
///
/// ```rust
/// use chrono::{FixedOffset, TimeZone, Utc};
/// use logparser_engine::datetime::{parse_date, DateFormat};
///
/// let formats = [DateFormat::compile("%W-%M-%DT%H:%T:%S")?];
/// let offset = FixedOffset::west_opt(2 * 3600).unwrap();
/// let parsed = parse_date("2017-10-16T15:23:42", &formats, offset, Utc::now());
/// assert_eq!(parsed, Utc.with_ymd_and_hms(2017, 10, 16, 17, 23, 42).single());
/// # Ok::<(), logparser_engine::ParserError>(())
/// ```
pub fn parse_date(
    input: &str,
    formats: &[DateFormat],
    default_offset: FixedOffset,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    formats
        .iter()
        .find_map(|format| try_date_format(format, input, default_offset, now))
}

fn try_duration_format(format: &DurationFormat, input: &str) -> Option<i64> {
    let mut total: i64 = 0;
    let mut pos = 0;
    for part in format.parts() {
        match part {
            DatePart::Fixed(component, width) => {
                let (value, digits) = read_digits(input, pos, *width, *width)?;
                total = total.checked_add(value.checked_mul(unit_seconds(*component))?)?;
                pos += digits;
            }
            DatePart::Variable(component) => {
                // Durations are not bounded by calendar widths.
                let (value, digits) = read_digits(input, pos, 1, 18)?;
                total = total.checked_add(value.checked_mul(unit_seconds(*component))?)?;
                pos += digits;
            }
            DatePart::Hms => {
                let ([h, m, s], next) = match_hms(input, pos)?;
                total = total.checked_add(h * 3600 + m * 60 + s)?;
                pos = next;
            }
            DatePart::Literal(text) => pos = match_literal(input, pos, text)?,
            _ => return None,
        }
    }
    Some(total)
}

fn unit_seconds(component: Component) -> i64 {
    match component {
        Component::Day => 86_400,
        Component::Hour => 3_600,
        Component::Minute => 60,
        _ => 1,
    }
}

/// Parse a duration in seconds with the first format that fits.
///
/// # Examples
///
/// ```rust
/// use logparser_engine::datetime::{parse_duration, DurationFormat};
///
/// let formats = [DurationFormat::compile("%F days %Z")?];
/// assert_eq!(parse_duration("2 days 01:00:05", &formats), Some(2 * 86_400 + 3_605));
/// # Ok::<(), logparser_engine::ParserError>(())
/// ```
pub fn parse_duration(input: &str, formats: &[DurationFormat]) -> Option<i64> {
    formats
        .iter()
        .find_map(|format| try_duration_format(format, input))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn fmt(s: &str) -> DateFormat {
        DateFormat::compile(s).unwrap()
    }

    #[test]
    fn test_two_digit_year_expansion() {
        assert_eq!(expand_two_digit_year(69), 2069);
        assert_eq!(expand_two_digit_year(70), 1970);
        assert_eq!(expand_two_digit_year(0), 2000);
        assert_eq!(expand_two_digit_year(99), 1999);
    }

    #[test]
    fn test_fixed_offset_applied() {
        let offset = FixedOffset::west_opt(7200).unwrap();
        let parsed = parse_date(
            "2017-10-16T15:23:42",
            &[fmt("%W-%M-%DT%H:%T:%S")],
            offset,
            at(2024, 1, 1),
        );
        assert_eq!(parsed, Utc.with_ymd_and_hms(2017, 10, 16, 17, 23, 42).single());
    }

    #[test]
    fn test_yearless_date_rolls_back() {
        let parsed = parse_date("Dec 31", &[fmt("%B %F")], utc(), at(2024, 1, 1));
        assert_eq!(parsed, Some(at(2023, 12, 31)));
    }

    #[test]
    fn test_yearless_date_within_tolerance_keeps_year() {
        let parsed = parse_date("Jan 2", &[fmt("%B %F")], utc(), at(2024, 1, 1));
        assert_eq!(parsed, Some(at(2024, 1, 2)));
    }

    #[test]
    fn test_two_digit_year_in_format() {
        let parsed = parse_date("69-01-01", &[fmt("%Y-%M-%D")], utc(), at(2024, 1, 1));
        assert_eq!(parsed, Some(at(2069, 1, 1)));
        let parsed = parse_date("70-01-01", &[fmt("%Y-%M-%D")], utc(), at(2024, 1, 1));
        assert_eq!(parsed, Some(at(1970, 1, 1)));
    }

    #[test]
    fn test_first_matching_format_wins() {
        let formats = [fmt("%W/%M/%D"), fmt("%D/%M/%W"), fmt("%M/%D/%W")];
        let parsed = parse_date("05/06/2020", &formats, utc(), at(2024, 1, 1));
        assert_eq!(parsed, Some(at(2020, 6, 5)));
    }

    #[test]
    fn test_all_formats_fail() {
        let parsed = parse_date("not a date", &[fmt("%W-%M-%D")], utc(), at(2024, 1, 1));
        assert_eq!(parsed, None);
    }

    #[test]
    fn test_out_of_range_component_fails() {
        let parsed = parse_date("2020-13-01", &[fmt("%W-%M-%D")], utc(), at(2024, 1, 1));
        assert_eq!(parsed, None);
        let parsed = parse_date("2021-02-29", &[fmt("%W-%M-%D")], utc(), at(2024, 1, 1));
        assert_eq!(parsed, None);
    }

    #[test]
    fn test_month_names_long_and_short() {
        let formats = [fmt("%B %F %W")];
        let now = at(2024, 1, 1);
        assert_eq!(parse_date("September 3 2020", &formats, utc(), now), Some(at(2020, 9, 3)));
        assert_eq!(parse_date("sep 3 2020", &formats, utc(), now), Some(at(2020, 9, 3)));
        assert_eq!(parse_date("Foo 3 2020", &formats, utc(), now), None);
    }

    #[test]
    fn test_literal_whitespace_tolerance() {
        let formats = [fmt("%B %F %Z %W")];
        let parsed = parse_date("Oct  2 03:04:05 2019", &formats, utc(), at(2024, 1, 1));
        assert_eq!(parsed, Utc.with_ymd_and_hms(2019, 10, 2, 3, 4, 5).single());
    }

    #[test]
    fn test_am_pm() {
        let formats = [fmt("%W-%M-%D %N:%T %P")];
        let now = at(2024, 1, 1);
        assert_eq!(
            parse_date("2020-01-01 1:30 PM", &formats, utc(), now),
            Utc.with_ymd_and_hms(2020, 1, 1, 13, 30, 0).single()
        );
        assert_eq!(
            parse_date("2020-01-01 12:05 am", &formats, utc(), now),
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 5, 0).single()
        );
    }

    #[test]
    fn test_epoch() {
        let parsed = parse_date("1508167422", &[fmt("%X")], utc(), at(2024, 1, 1));
        assert_eq!(parsed, Utc.with_ymd_and_hms(2017, 10, 16, 15, 23, 42).single());
    }

    #[test]
    fn test_zone_overrides_default_offset() {
        let formats = [fmt("%W-%M-%D %Z %z")];
        let default = FixedOffset::east_opt(9 * 3600).unwrap();
        let parsed = parse_date("2020-01-01 10:00:00 +0100", &formats, default, at(2024, 1, 1));
        assert_eq!(parsed, Utc.with_ymd_and_hms(2020, 1, 1, 9, 0, 0).single());
        let parsed = parse_date("2020-01-01 10:00:00 UTC", &formats, default, at(2024, 1, 1));
        assert_eq!(parsed, Utc.with_ymd_and_hms(2020, 1, 1, 10, 0, 0).single());
    }

    #[test]
    fn test_weekday_and_fraction() {
        let formats = [fmt("%w %B %F %H:%T:%S.%f %W")];
        let parsed = parse_date("Mon Oct 16 15:23:42.250 2017", &formats, utc(), at(2024, 1, 1));
        let expected = Utc.with_ymd_and_hms(2017, 10, 16, 15, 23, 42).unwrap()
            + Duration::milliseconds(250);
        assert_eq!(parsed, Some(expected));
    }

    #[test]
    fn test_duration_units() {
        let formats = [DurationFormat::compile("%N:%U:%O").unwrap()];
        assert_eq!(parse_duration("1:02:03", &formats), Some(3723));

        let formats = [DurationFormat::compile("%F").unwrap()];
        assert_eq!(parse_duration("3", &formats), Some(3 * 86_400));
    }

    #[test]
    fn test_duration_variable_width_is_unbounded() {
        let formats = [DurationFormat::compile("%O").unwrap()];
        assert_eq!(parse_duration("123456", &formats), Some(123_456));
    }

    #[test]
    fn test_duration_fallback_and_failure() {
        let formats = [
            DurationFormat::compile("%Z").unwrap(),
            DurationFormat::compile("%O sec").unwrap(),
        ];
        assert_eq!(parse_duration("45 sec", &formats), Some(45));
        assert_eq!(parse_duration("soon", &formats), None);
    }
}
