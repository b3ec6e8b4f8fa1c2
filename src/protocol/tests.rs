use super::*;

fn parse_all(buf: &[u8]) -> RespValue {
    match try_parse(buf).unwrap() {
        ParseOutcome::Value(v, n) => {
            assert_eq!(n, buf.len(), "expected to consume the whole buffer");
            v
        }
        ParseOutcome::Incomplete => panic!("expected a complete value"),
    }
}

#[test]
fn round_trip_simple_string() {
    let v = RespValue::simple(&b"OK"[..]);
    let bytes = encode(&v).unwrap();
    assert_eq!(bytes, b"+OK\r\n");
    assert_eq!(parse_all(&bytes), v);
}

#[test]
fn round_trip_error() {
    let v = RespValue::error(&b"ERR boom"[..]);
    let bytes = encode(&v).unwrap();
    assert_eq!(parse_all(&bytes), v);
}

#[test]
fn round_trip_integer() {
    for n in [0_i64, -1, i64::MAX, i64::MIN] {
        let v = RespValue::Integer(n);
        let bytes = encode(&v).unwrap();
        assert_eq!(parse_all(&bytes), v);
    }
}

#[test]
fn round_trip_bulk_string() {
    let v = RespValue::bulk(&b"hello world"[..]);
    let bytes = encode(&v).unwrap();
    assert_eq!(bytes, b"$11\r\nhello world\r\n");
    assert_eq!(parse_all(&bytes), v);
}

#[test]
fn round_trip_null_bulk_and_array() {
    assert_eq!(encode(&RespValue::null_bulk()).unwrap(), b"$-1\r\n");
    assert_eq!(parse_all(b"$-1\r\n"), RespValue::null_bulk());
    assert_eq!(encode(&RespValue::null_array()).unwrap(), b"*-1\r\n");
    assert_eq!(parse_all(b"*-1\r\n"), RespValue::null_array());
}

#[test]
fn round_trip_nested_array() {
    let v = RespValue::Array(Some(vec![
        RespValue::bulk(&b"SET"[..]),
        RespValue::Array(Some(vec![RespValue::Integer(1), RespValue::Integer(2)])),
        RespValue::null_bulk(),
    ]));
    let bytes = encode(&v).unwrap();
    assert_eq!(parse_all(&bytes), v);
}

#[test]
fn framing_successive_values_have_no_residue() {
    let a = encode(&RespValue::simple(&b"PONG"[..])).unwrap();
    let b = encode(&RespValue::Integer(42)).unwrap();
    let mut stream = Vec::new();
    stream.extend_from_slice(&a);
    stream.extend_from_slice(&b);

    let ParseOutcome::Value(v1, n1) = try_parse(&stream).unwrap() else {
        panic!("expected value")
    };
    assert_eq!(v1, RespValue::simple(&b"PONG"[..]));
    let ParseOutcome::Value(v2, n2) = try_parse(&stream[n1..]).unwrap() else {
        panic!("expected value")
    };
    assert_eq!(v2, RespValue::Integer(42));
    assert_eq!(n1 + n2, stream.len());
}

#[test]
fn incomplete_buffer_asks_for_more() {
    // Genuinely partial input: more bytes may still be on the way.
    assert!(matches!(
        try_parse(b"$5\r\nhi").unwrap(),
        ParseOutcome::Incomplete
    ));
    assert!(matches!(try_parse(b"").unwrap(), ParseOutcome::Incomplete));
}

#[test]
fn rejects_missing_cr() {
    assert_eq!(decode_complete(b"+OK\n"), Err(ProtocolError::MissingCrlf));
}

#[test]
fn rejects_short_payload() {
    // The stream ends with only 2 of the promised 5 payload bytes present.
    assert_eq!(
        decode_complete(b"$5\r\nhi\r\n"),
        Err(ProtocolError::UnexpectedEof)
    );
}

#[test]
fn rejects_out_of_range_bulk_length() {
    assert_eq!(decode_complete(b"$-2\r\n"), Err(ProtocolError::BadBulkLength));
}

#[test]
fn rejects_short_array() {
    assert_eq!(
        decode_complete(b"*2\r\n:1\r\n"),
        Err(ProtocolError::UnexpectedEof)
    );
}

#[test]
fn inline_fallback_treats_line_as_simple_string() {
    let v = parse_all(b"PING\r\n");
    assert_eq!(v, RespValue::simple(&b"PING"[..]));
}
