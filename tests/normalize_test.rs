//! Integration tests for type conversion and schema projection.

use logparser_engine::normalize::{
    to_ip, to_long, to_mac, to_url, Converter, Destination, FieldMapping, MappingEntry,
    MergePolicy, Url, UrlComponent,
};
use logparser_engine::{FieldBag, FieldValue};
use serde_json::json;

#[test]
fn test_ip_validation() {
    assert!(to_ip("008.189.239.199").is_some());
    assert!(to_ip("10.100.1000.1").is_none());
    assert!(to_ip("::1").is_some());
    assert!(to_ip("fff::1::3").is_none());
    assert!(to_ip("::ffff:10.0.0.1").is_some());
    assert!(to_ip("1:2:3:4:5:6:7:8").is_some());
    assert!(to_ip("1:2:3:4:5:6:7").is_none());
}

#[test]
fn test_long_limits() {
    assert_eq!(to_long("1234"), Some(1234));
    assert_eq!(to_long("9007199254740991"), Some(9_007_199_254_740_991));
    assert_eq!(to_long("9007199254740992"), None);
    assert_eq!(to_long("-9007199254740991"), Some(-9_007_199_254_740_991));
    assert_eq!(to_long("000000000000000042"), Some(42));
    assert_eq!(to_long("12\u{0663}"), Some(12));
}

#[test]
fn test_mac_normalized() {
    assert_eq!(to_mac("00-1A-2B-3C-4D-5E").as_deref(), Some("00:1a:2b:3c:4d:5e"));
    assert_eq!(to_mac("00:1a-2b:3c:4d:5e"), None);
}

#[test]
fn test_priority_merge_regardless_of_source_order() {
    // Sources merge in table order; swapping which source holds which
    // priority exercises both arrival orders.
    for (first_priority, second_priority, expected) in [(5, 2, "second"), (2, 5, "first")] {
        let mut mapping = FieldMapping::with_schema("ecs");
        mapping.add_mapping(
            "a_first",
            MappingEntry::new(vec![Destination::with_priority("event.type", first_priority)]),
        );
        mapping.add_mapping(
            "b_second",
            MappingEntry::new(vec![Destination::with_priority("event.type", second_priority)]),
        );
        let mut bag = FieldBag::new();
        bag.set("a_first", "first");
        bag.set("b_second", "second");
        assert_eq!(mapping.project(&bag, false).get("event.type"), Some(json!(expected)));
    }
}

#[test]
fn test_append_unique_from_two_sources() {
    let mut mapping = FieldMapping::with_schema("ecs");
    for source in ["username", "dst_user"] {
        mapping.add_mapping(
            source,
            MappingEntry::new(vec![Destination::new("related.user", MergePolicy::AppendUnique)]),
        );
    }
    let mut bag = FieldBag::new();
    bag.set("username", "root");
    bag.set("dst_user", "root");
    assert_eq!(mapping.project(&bag, false).get("related.user"), Some(json!(["root"])));
}

#[test]
fn test_outcome_policy_through_mapping() {
    let mapping = FieldMapping::from_yaml(
        "ecs",
        r#"
disposition:
  destinations: [{ field: event.outcome, policy: outcome }]
result:
  destinations: [{ field: event.outcome, policy: outcome }]
"#,
    )
    .unwrap();
    let mut bag = FieldBag::new();
    bag.set("disposition", "blocked");
    bag.set("result", "Failure");
    assert_eq!(mapping.project(&bag, false).get("event.outcome"), Some(json!("failure")));
}

#[test]
fn test_failed_conversion_skips_key() {
    let mut mapping = FieldMapping::with_schema("ecs");
    mapping.add_mapping(
        "saddr",
        MappingEntry::converted(
            Converter::Ip,
            vec![Destination::new("source.ip", MergePolicy::Overwrite)],
        ),
    );
    let bag = FieldBag::with_field("saddr", FieldValue::from("999.1.1.1"));
    assert!(mapping.project(&bag, true).is_empty());
}

#[test]
fn test_converter_names_from_tables() {
    assert_eq!(Converter::from_name("to_long").unwrap(), Converter::Long);
    assert_eq!(Converter::from_name("ip").unwrap(), Converter::Ip);
    assert_eq!(Converter::from_name("to_url").unwrap(), Converter::Url);
    assert!(Converter::from_name("to_uri").is_err());
}

#[test]
fn test_url_validation() {
    assert_eq!(
        to_url("https://Portal.Example.org/login.jsp?next=%2F").as_deref(),
        Some("https://portal.example.org/login.jsp?next=%2F")
    );
    assert!(to_url("http://[::1]:8080/").is_some());
    assert!(to_url("http://256.1.1.1/").is_none());
    assert!(to_url("http://under_score-.example.com/").is_none());
    assert!(to_url("just-a-word").is_none());
}

#[test]
fn test_url_components_through_mapping() {
    let mapping = FieldMapping::from_yaml(
        "ecs",
        r#"
url:
  convert: to_url
  destinations: [{ field: url.original }]
"#,
    )
    .unwrap();
    let bag = FieldBag::with_field("url", "HTTP://CDN.example.net/static/app.js");
    assert_eq!(
        mapping.project(&bag, false).get("url.original"),
        Some(json!("http://cdn.example.net/static/app.js"))
    );

    let url = Url::parse("http://cdn.example.net/static/app.js").unwrap();
    assert_eq!(url.component(UrlComponent::Extension), Some(FieldValue::from("js")));
    assert_eq!(url.component(UrlComponent::Port), Some(FieldValue::Int(80)));
}

#[test]
fn test_append_unique_follows_table_order() {
    let mapping = FieldMapping::from_yaml(
        "ecs",
        r#"
src_user:
  destinations: [{ field: related.user, policy: append_unique }]
dst_user:
  destinations: [{ field: related.user, policy: append_unique }]
"#,
    )
    .unwrap();
    let mut bag = FieldBag::new();
    bag.set("dst_user", "bob");
    bag.set("src_user", "alice");
    assert_eq!(
        mapping.project(&bag, false).get("related.user"),
        Some(json!(["alice", "bob"]))
    );
}
