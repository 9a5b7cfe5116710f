//! End-to-end tests: device definitions on disk through to output records.

use chrono::{FixedOffset, TimeZone, Utc};
use logparser_engine::matcher::ParseContext;
use logparser_engine::{Compiler, LogParser, ParserConfig, ParserError, TimezoneMode};
use serde_json::json;
use std::io::Write;

const FIREWALL: &str = r#"
name: firewall
header:
  - dissect:
      pattern: "%{month->} %{day} %{time} %{hostname} %{messageid}: %{payload}"
  - dissect:
      pattern: "%{hostname} %{messageid}: %{payload}"
messages:
  TRAFFIC:
    any:
      - msg:
          id: TRAFFIC_DENY
          node:
            dissect:
              pattern: "deny %{protocol} %{saddr}:%{sport} -> %{daddr}:%{dport} after %{elapsed}"
          on_success:
            - set: { dest: disposition, value: failure }
            - lookup: { dest: severity, table: protocols, key: { field: protocol } }
            - date: { dest: event_time, args: [month, day, time], formats: ["%B %F %H:%T:%S"] }
            - duration: { dest: duration, args: [elapsed], formats: ["%Z"] }
            - call: { dest: direction, function: DIRCHK, args: [{ field: saddr }, { field: daddr }] }
      - msg:
          id: TRAFFIC_ALLOW
          node:
            dissect:
              pattern: "allow %{protocol} %{saddr}:%{sport} -> %{daddr}:%{dport}"
          on_success:
            - set: { dest: disposition, value: success }
            - date: { dest: event_time, args: [month, day, time], formats: ["%B %F %H:%T:%S"] }
  ADMIN:
    all:
      nodes:
        - dissect: { pattern: "user=%{username->} cmd=%{command}" }
        - copy: { source: username, dest: admin }
      on_success:
        - call: { dest: command, function: RMQ, args: [{ field: command }] }
        - call: { dest: summary, function: STRCAT, args: [{ field: admin }, { constant: " ran " }, { field: command }] }
        - call: { dest: ignored, function: UTC, args: [] }
lookups:
  protocols:
    entries: { tcp: medium, icmp: low }
    default: unknown
ecs:
  saddr:
    convert: to_ip
    destinations:
      - { field: source.ip }
      - { field: related.ip, policy: append_unique }
  daddr:
    convert: to_ip
    destinations:
      - { field: destination.ip }
      - { field: related.ip, policy: append_unique }
  sport:
    convert: to_long
    destinations: [{ field: source.port }]
  dport:
    convert: to_long
    destinations: [{ field: destination.port }]
  hostname:
    destinations: [{ field: observer.name }]
  disposition:
    destinations: [{ field: event.outcome, policy: outcome }]
  event_time:
    convert: to_date
    destinations: [{ field: "@timestamp" }]
  duration:
    destinations: [{ field: event.duration_seconds }]
  username:
    destinations: [{ field: user.name, priority: 2, policy: priority }]
  admin:
    destinations: [{ field: user.name, priority: 5, policy: priority }]
rsa:
  protocol:
    convert: to_lowercase
    destinations: [{ field: rsa.network.protocol }]
  severity:
    destinations: [{ field: rsa.misc.severity }]
  direction:
    destinations: [{ field: rsa.network.direction }]
  summary:
    destinations: [{ field: rsa.misc.summary }]
"#;

fn write_definition(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn parser(config: ParserConfig) -> LogParser {
    let file = write_definition(".yaml", FIREWALL);
    let device = Compiler::new().compile_file(file.path()).unwrap();
    LogParser::new(device, config).unwrap()
}

#[test]
fn test_traffic_deny_record() {
    let parser = parser(ParserConfig::with_tz_offset("+00:00").unwrap());
    let config = parser.config().clone();
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let ctx = ParseContext::new(&config, now, FixedOffset::east_opt(0).unwrap());

    let record = parser.process_in(
        &ctx,
        "<190>Mar  4 09:10:11 fw01 TRAFFIC: deny TCP 192.168.1.10:51514 -> 8.8.8.8:53 after 00:00:07",
    );

    assert_eq!(record["observer"]["name"], "fw01");
    assert_eq!(record["source"]["ip"], "192.168.1.10");
    assert_eq!(record["source"]["port"], 51514);
    assert_eq!(record["destination"]["port"], 53);
    assert_eq!(record["related"]["ip"], json!(["192.168.1.10", "8.8.8.8"]));
    assert_eq!(record["event"]["outcome"], "failure");
    assert_eq!(record["event"]["duration_seconds"], 7);
    assert_eq!(record["@timestamp"], "2024-03-04T09:10:11Z");
    assert_eq!(record["rsa"]["network"]["protocol"], "tcp");
    assert_eq!(record["rsa"]["network"]["direction"], "outbound");
    assert_eq!(record["rsa"]["misc"]["severity"], "unknown");
    assert_eq!(record["log"]["syslog"]["facility"]["code"], 23);
    assert_eq!(record["log"]["syslog"]["severity"]["code"], 6);
    assert!(record.get("error").is_none());
}

#[test]
fn test_second_header_and_alternative_message() {
    let parser = parser(ParserConfig::default());
    let bag = parser.parse_fields("fw02 TRAFFIC: allow icmp 10.0.0.1:0 -> 10.0.0.2:0", None);
    assert_eq!(bag.get_str("hostname"), Some("fw02"));
    assert_eq!(bag.get_str("msg_id1"), Some("TRAFFIC_ALLOW"));
    assert_eq!(bag.get_str("disposition"), Some("success"));
    // No date fields in this header shape.
    assert!(!bag.contains("event_time"));
}

#[test]
fn test_admin_sequence_and_functions() {
    let record = parser(ParserConfig::default())
        .process("fw01 ADMIN: user=root    cmd=\"show run\"");
    assert_eq!(record["user"]["name"], "root");
    assert_eq!(record["rsa"]["misc"]["summary"], "root ran show run");
    assert_eq!(record["error"]["message"], json!(["unimplemented feature: UTC"]));
}

#[test]
fn test_unmatched_message_passes_through() {
    let config = ParserConfig {
        keep_raw: true,
        ..ParserConfig::default()
    };
    let record = parser(config).process("fw01 TRAFFIC: something unexpected");
    assert_eq!(record["observer"]["name"], "fw01");
    assert!(record.get("source").is_none());
    assert_eq!(record["rsa"]["raw"]["payload"], "something unexpected");
    assert!(record["rsa"]["raw"].get("msg_id1").is_none());
}

#[test]
fn test_event_timezone_mode() {
    let config = ParserConfig {
        tz_offset: TimezoneMode::parse("event").unwrap(),
        ..ParserConfig::default()
    };
    let parser = parser(config);
    let line = "Jan  2 10:00:00 fw01 TRAFFIC: allow tcp 10.0.0.1:1 -> 10.0.0.2:2";

    let shifted = parser.parse_fields(line, Some("+02:00"));
    let utc = parser.parse_fields(line, None);
    let invalid = parser.parse_fields(line, Some("Mars/Olympus"));

    let shifted = shifted.get("event_time").unwrap().to_text();
    let utc = utc.get("event_time").unwrap().to_text();
    let invalid = invalid.get("event_time").unwrap().to_text();
    assert!(shifted.ends_with("-01-02T08:00:00Z"), "{shifted}");
    assert!(utc.ends_with("-01-02T10:00:00Z"), "{utc}");
    assert_eq!(invalid, utc);
}

#[test]
fn test_json_definition_file() {
    let json = r#"{
        "name": "json-device",
        "header": [{ "dissect": { "pattern": "%{messageid}|%{payload}" } }],
        "messages": { "X": { "dissect": { "pattern": "v=%{value}" } } },
        "rsa": { "value": { "convert": "to_long", "destinations": [{ "field": "rsa.counters.value" }] } }
    }"#;
    let file = write_definition(".json", json);
    let device = Compiler::new().compile_file(file.path()).unwrap();
    let parser = LogParser::new(device, ParserConfig::default()).unwrap();
    let record = parser.process("X|v=42");
    assert_eq!(record["rsa"]["counters"]["value"], 42);
}

#[test]
fn test_missing_definition_file() {
    let err = Compiler::new()
        .compile_file("/nonexistent/device.yaml")
        .unwrap_err();
    assert!(matches!(err, ParserError::IoError(_)));
}

#[test]
fn test_batch_processing_matches_sequential() {
    let parser = parser(ParserConfig::default());
    let lines: Vec<String> = (0..64)
        .map(|i| format!("fw{i} TRAFFIC: allow tcp 10.0.0.{i}:1000 -> 10.1.0.1:443"))
        .collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();

    let batch = parser.process_batch(&refs);
    let sequential: Vec<_> = refs.iter().map(|line| parser.process(line)).collect();
    assert_eq!(batch.len(), 64);
    for (b, s) in batch.iter().zip(&sequential) {
        assert_eq!(b["source"], s["source"]);
        assert_eq!(b["observer"], s["observer"]);
    }
    assert_eq!(batch[7]["source"]["ip"], "10.0.0.7");
}

const PROXY: &str = r#"
name: proxy
header:
  - dissect:
      pattern: "%{hostname} %{messageid}: %{payload}"
messages:
  REQUEST:
    all:
      nodes:
        - dissect: { pattern: "%{method} %{url} %{status}" }
        - if:
            field: method
            equals: CONNECT
            then: { copy: { source: url, dest: tunnel } }
            else: { copy: { source: status, dest: http_status } }
      on_success:
        - call: { dest: web_domain, function: URL, args: [{ constant: domain }, { field: url }] }
        - call: { dest: web_ext, function: URL, args: [{ constant: ext }, { field: url }] }
ecs:
  url:
    convert: to_url
    destinations: [{ field: url.original }]
  web_domain:
    destinations: [{ field: url.domain }]
  web_ext:
    destinations: [{ field: url.extension }]
  http_status:
    convert: to_long
    destinations: [{ field: http.response.status_code }]
"#;

#[test]
fn test_conditional_and_url_functions() {
    let parser = LogParser::from_yaml(PROXY, ParserConfig::default()).unwrap();

    let record = parser.process("px1 REQUEST: GET http://Files.Example.com/setup.exe 200");
    assert_eq!(record["url"]["original"], "http://files.example.com/setup.exe");
    assert_eq!(record["url"]["domain"], "files.example.com");
    assert_eq!(record["url"]["extension"], "exe");
    assert_eq!(record["http"]["response"]["status_code"], 200);

    let fields = parser.parse_fields("px1 REQUEST: CONNECT vpn.example.com:443 200", None);
    assert_eq!(fields.get_str("tunnel"), Some("vpn.example.com:443"));
    assert!(!fields.contains("http_status"));
    assert_eq!(fields.get_str("web_domain"), Some("vpn.example.com"));
    assert!(!fields.contains("web_ext"));

    let record = parser.process("px1 REQUEST: GET not_a_url 404");
    assert!(record.get("url").is_none());
    assert!(record.get("error").is_none());
}
