//! Integration tests for the date and duration parsers.

use chrono::{FixedOffset, TimeZone, Utc};
use logparser_engine::datetime::{
    expand_two_digit_year, parse_date, parse_duration, Component, DateFormat, DatePart,
    DurationFormat,
};

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

#[test]
fn test_explicit_parts_with_negative_offset() {
    let format = DateFormat::from_parts(vec![
        DatePart::Fixed(Component::Year, 4),
        DatePart::literal("-"),
        DatePart::Fixed(Component::Month, 2),
        DatePart::literal("-"),
        DatePart::Fixed(Component::Day, 2),
        DatePart::literal("T"),
        DatePart::Fixed(Component::Hour, 2),
        DatePart::literal(":"),
        DatePart::Fixed(Component::Minute, 2),
        DatePart::literal(":"),
        DatePart::Fixed(Component::Second, 2),
    ]);
    let offset = FixedOffset::west_opt(2 * 3600).unwrap();
    let parsed = parse_date("2017-10-16T15:23:42", &[format], offset, Utc::now()).unwrap();
    assert_eq!(parsed.to_rfc3339(), "2017-10-16T17:23:42+00:00");
}

#[test]
fn test_year_inferred_from_previous_year() {
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let formats = [DateFormat::compile("%B %F").unwrap()];
    let parsed = parse_date("Dec 31", &formats, utc(), now).unwrap();
    assert_eq!(parsed, Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap());
}

#[test]
fn test_two_digit_year_pivot() {
    assert_eq!(expand_two_digit_year(69), 2069);
    assert_eq!(expand_two_digit_year(70), 1970);

    let formats = [DateFormat::compile("%D/%M/%Y").unwrap()];
    let now = Utc::now();
    assert_eq!(
        parse_date("01/02/69", &formats, utc(), now),
        Utc.with_ymd_and_hms(2069, 2, 1, 0, 0, 0).single()
    );
    assert_eq!(
        parse_date("01/02/70", &formats, utc(), now),
        Utc.with_ymd_and_hms(1970, 2, 1, 0, 0, 0).single()
    );
}

#[test]
fn test_candidate_formats_tried_in_order() {
    let formats = [
        DateFormat::compile("%W-%M-%D %Z").unwrap(),
        DateFormat::compile("%B %F %W %Z").unwrap(),
    ];
    let parsed = parse_date("October 7 2021 08:01:02", &formats, utc(), Utc::now());
    assert_eq!(parsed, Utc.with_ymd_and_hms(2021, 10, 7, 8, 1, 2).single());
}

#[test]
fn test_syslog_style_timestamp() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let formats = [DateFormat::compile("%B %F %H:%T:%S").unwrap()];
    let parsed = parse_date("Mar  4 09:10:11", &formats, utc(), now);
    assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 4, 9, 10, 11).single());
}

#[test]
fn test_unparseable_input() {
    let formats = [DateFormat::compile("%W-%M-%D").unwrap()];
    assert_eq!(parse_date("yesterday", &formats, utc(), Utc::now()), None);
    assert_eq!(parse_date("", &formats, utc(), Utc::now()), None);
}

#[test]
fn test_duration_formats() {
    let formats = [
        DurationFormat::compile("%Z").unwrap(),
        DurationFormat::compile("%Fd%Nh%Um%Os").unwrap(),
    ];
    assert_eq!(parse_duration("00:10:00", &formats), Some(600));
    assert_eq!(parse_duration("1d2h3m4s", &formats), Some(86_400 + 7_200 + 180 + 4));
    assert_eq!(parse_duration("soon", &formats), None);
}

#[test]
fn test_duration_rejects_calendar_parts() {
    assert!(DurationFormat::compile("%W").is_err());
    assert!(DurationFormat::compile("%B").is_err());
}
