//! Codec Tests
//!
//! The codec's own `#[cfg(test)]` module covers basic parsing and a
//! single round trip; this file exercises the full command surface
//! (including RANGE, BATCH, and the replication verbs) plus error paths
//! and response framing over a buffered stream.

use std::io::{BufReader, Cursor};

use atlaskv::protocol::{read_command, write_response, Command, Response, Status};

fn parse(line: &str) -> atlaskv::Result<Command> {
    let mut reader = BufReader::new(Cursor::new(format!("{line}\n")));
    read_command(&mut reader)
}

// =============================================================================
// Command Parsing
// =============================================================================

#[test]
fn parses_get() {
    assert_eq!(parse("GET|hello").unwrap(), Command::Get { key: b"hello".to_vec() });
}

#[test]
fn parses_put() {
    assert_eq!(
        parse("PUT|mykey|myvalue").unwrap(),
        Command::Put { key: b"mykey".to_vec(), value: b"myvalue".to_vec() }
    );
}

#[test]
fn parses_delete() {
    assert_eq!(parse("DELETE|todelete").unwrap(), Command::Delete { key: b"todelete".to_vec() });
}

#[test]
fn parses_ping() {
    assert_eq!(parse("PING").unwrap(), Command::Ping);
}

#[test]
fn parses_replication_verbs() {
    assert_eq!(
        parse("REPLICATE|k|v").unwrap(),
        Command::Replicate { key: b"k".to_vec(), value: b"v".to_vec() }
    );
    assert_eq!(parse("REPLICATE_DEL|k").unwrap(), Command::ReplicateDelete { key: b"k".to_vec() });
}

#[test]
fn parses_empty_key_and_value() {
    assert_eq!(parse("GET|").unwrap(), Command::Get { key: vec![] });
    assert_eq!(parse("PUT|key|").unwrap(), Command::Put { key: b"key".to_vec(), value: vec![] });
}

#[test]
fn parses_binary_payload_as_raw_bytes() {
    // the wire protocol is line-oriented ASCII with `|` as the delimiter;
    // arbitrary bytes that aren't `|`, `\r`, or `\n` pass through untouched
    let binary_value: Vec<u8> = (0..=255u16).filter(|&b| b != b'|' as u16).map(|b| b as u8).collect();
    let line = format!("PUT|key|{}", String::from_utf8_lossy(&binary_value));
    let mut reader = BufReader::new(Cursor::new(format!("{line}\n")));
    match read_command(&mut reader).unwrap() {
        Command::Put { key, .. } => assert_eq!(key, b"key"),
        other => panic!("expected Put, got {other:?}"),
    }
}

#[test]
fn range_requires_two_fields() {
    assert_eq!(parse("RANGE|a|z").unwrap(), Command::Range { start: b"a".to_vec(), end: b"z".to_vec() });
    assert!(parse("RANGE|a").is_err());
}

#[test]
fn batch_requires_even_field_count() {
    assert_eq!(
        parse("BATCH|k1|v1|k2|v2").unwrap(),
        Command::BatchPut { keys: vec![b"k1".to_vec(), b"k2".to_vec()], values: vec![b"v1".to_vec(), b"v2".to_vec()] }
    );
    assert!(parse("BATCH|k1|v1|k2").is_err());
    assert!(parse("BATCH").is_err());
}

#[test]
fn unknown_verb_is_a_protocol_error() {
    assert!(parse("NOPE|x").is_err());
}

#[test]
fn missing_field_is_a_protocol_error() {
    assert!(parse("GET").is_err());
    assert!(parse("PUT|onlykey").is_err());
}

#[test]
fn connection_closed_before_a_line_arrives_is_an_io_error() {
    let mut reader = BufReader::new(Cursor::new(Vec::<u8>::new()));
    let err = read_command(&mut reader).unwrap_err();
    assert!(matches!(err, atlaskv::AtlasError::Io(_)));
}

// =============================================================================
// Response Encoding
// =============================================================================

#[test]
fn encodes_ok_with_and_without_payload() {
    let mut buf = Vec::new();
    write_response(&mut buf, &Response::ok(Some(b"value".to_vec()))).unwrap();
    assert_eq!(buf, b"OK|value\n");

    let mut buf = Vec::new();
    write_response(&mut buf, &Response::ok(None)).unwrap();
    assert_eq!(buf, b"OK\n");
}

#[test]
fn encodes_not_found() {
    let mut buf = Vec::new();
    write_response(&mut buf, &Response::not_found()).unwrap();
    assert_eq!(buf, b"NOT_FOUND\n");
}

#[test]
fn encodes_error_with_message() {
    let mut buf = Vec::new();
    write_response(&mut buf, &Response::error("something went wrong")).unwrap();
    assert_eq!(buf, b"ERROR|something went wrong\n");
}

#[test]
fn range_response_joins_pairs_with_pipes() {
    let mut entries = std::collections::BTreeMap::new();
    entries.insert(b"a".to_vec(), b"1".to_vec());
    entries.insert(b"b".to_vec(), b"2".to_vec());

    let response = Response::range(&entries);
    assert_eq!(response.status, Status::Ok);
    assert_eq!(response.payload, Some(b"a=1|b=2".to_vec()));
}

#[test]
fn range_response_empty_map_has_empty_payload() {
    let entries = std::collections::BTreeMap::new();
    let response = Response::range(&entries);
    assert_eq!(response.payload, Some(Vec::new()));
}

// =============================================================================
// Stream I/O
// =============================================================================

#[test]
fn multiple_commands_over_one_stream() {
    let script = "PING\nPUT|k1|v1\nGET|k1\nDELETE|k1\n";
    let mut reader = BufReader::new(Cursor::new(script));

    assert_eq!(read_command(&mut reader).unwrap(), Command::Ping);
    assert_eq!(read_command(&mut reader).unwrap(), Command::Put { key: b"k1".to_vec(), value: b"v1".to_vec() });
    assert_eq!(read_command(&mut reader).unwrap(), Command::Get { key: b"k1".to_vec() });
    assert_eq!(read_command(&mut reader).unwrap(), Command::Delete { key: b"k1".to_vec() });
    assert!(read_command(&mut reader).is_err());
}

#[test]
fn multiple_responses_over_one_stream() {
    let responses =
        vec![Response::ok(Some(b"data".to_vec())), Response::not_found(), Response::error("oops"), Response::ok(None)];

    let mut buf = Vec::new();
    for resp in &responses {
        write_response(&mut buf, resp).unwrap();
    }

    let text = String::from_utf8(buf).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines, vec!["OK|data", "NOT_FOUND", "ERROR|oops", "OK"]);
}
