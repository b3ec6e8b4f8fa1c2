/*
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
*/

//! Normalizes a parsed [`RespValue`] into a [`Request`] (spec §4.2).

use crate::protocol::RespValue;
use bytes::Bytes;

/// A client command, already split into name/key/args.
#[derive(Debug, Clone)]
pub struct Request {
    pub command: String,
    pub key: Bytes,
    /// Whether `args_raw` actually had a second element, i.e. whether a key
    /// argument was supplied at all. Distinct from `key.is_empty()`: a
    /// client can legally send an empty-string key (`$0\r\n\r\n`), which
    /// must still count toward `command_length`.
    pub key_present: bool,
    pub args: Vec<Bytes>,
    pub raw: Bytes,
    pub valid: bool,
}

impl Request {
    /// The total number of words in the command line, matching spec's
    /// invariant `command_length = (has_key ? 1 : 0) + 1 + |args|`.
    pub fn command_length(&self) -> usize {
        (self.key_present as usize) + 1 + self.args.len()
    }

    fn invalid(raw: Bytes) -> Self {
        Self {
            command: String::new(),
            key: Bytes::new(),
            key_present: false,
            args: Vec::new(),
            raw,
            valid: false,
        }
    }
}

/// Flatten a decoded [`RespValue`] into a plain sequence of byte-string
/// arguments, per spec §4.2: arrays of strings copy through verbatim,
/// bare strings are split on ASCII space (the permissive inline path).
fn flatten_args(value: &RespValue) -> Option<Vec<Bytes>> {
    match value {
        RespValue::Array(Some(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    RespValue::BulkString(Some(b)) => out.push(b.clone()),
                    RespValue::SimpleString(s) => out.push(s.clone()),
                    _ => return None,
                }
            }
            Some(out)
        }
        RespValue::Array(None) => Some(Vec::new()),
        RespValue::SimpleString(s) => Some(
            s.split(|&b| b == b' ')
                .map(Bytes::copy_from_slice)
                .collect(),
        ),
        _ => None,
    }
}

/// Build a [`Request`] from a decoded value and the raw bytes that produced
/// it (the latter is journaled verbatim for writable commands).
pub fn parse_command(value: &RespValue, raw: Bytes) -> Request {
    let args_raw = match flatten_args(value) {
        Some(a) => a,
        None => return Request::invalid(raw),
    };
    if args_raw.is_empty() {
        return Request::invalid(raw);
    }
    let command = String::from_utf8_lossy(&args_raw[0]).to_ascii_uppercase();
    let key_present = args_raw.len() > 1;
    let key = args_raw.get(1).cloned().unwrap_or_default();
    let args = if args_raw.len() > 2 {
        args_raw[2..].to_vec()
    } else {
        Vec::new()
    };
    Request {
        command,
        key,
        key_present,
        args,
        raw,
        valid: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(s: &str) -> RespValue {
        RespValue::bulk(Bytes::copy_from_slice(s.as_bytes()))
    }

    #[test]
    fn array_command_splits_into_command_key_args() {
        let v = RespValue::Array(Some(vec![bulk("SET"), bulk("foo"), bulk("bar")]));
        let req = parse_command(&v, Bytes::from_static(b"raw"));
        assert!(req.valid);
        assert_eq!(req.command, "SET");
        assert_eq!(&req.key[..], b"foo");
        assert_eq!(req.args.len(), 1);
        assert_eq!(&req.args[0][..], b"bar");
    }

    #[test]
    fn inline_command_splits_on_space() {
        let v = RespValue::simple(Bytes::from_static(b"PING"));
        let req = parse_command(&v, Bytes::from_static(b"PING\r\n"));
        assert!(req.valid);
        assert_eq!(req.command, "PING");
        assert!(!req.key_present);
        assert!(req.key.is_empty());
    }

    #[test]
    fn inline_command_keeps_empty_tokens_from_doubled_spaces() {
        let v = RespValue::simple(Bytes::from_static(b"GET  foo"));
        let req = parse_command(&v, Bytes::from_static(b"GET  foo\r\n"));
        assert!(req.valid);
        assert_eq!(req.command, "GET");
        assert!(req.key_present);
        assert!(req.key.is_empty(), "doubled space yields an empty key token, not 'foo'");
        assert_eq!(req.args.len(), 1);
        assert_eq!(&req.args[0][..], b"foo");
    }

    #[test]
    fn explicit_empty_string_key_is_present_not_absent() {
        let v = RespValue::Array(Some(vec![bulk("GET"), bulk("")]));
        let req = parse_command(&v, Bytes::from_static(b"raw"));
        assert!(req.valid);
        assert!(req.key_present);
        assert!(req.key.is_empty());
        assert_eq!(req.command_length(), 2);
    }

    #[test]
    fn absent_key_is_not_counted_in_command_length() {
        let v = RespValue::Array(Some(vec![bulk("PING")]));
        let req = parse_command(&v, Bytes::from_static(b"raw"));
        assert!(req.valid);
        assert!(!req.key_present);
        assert_eq!(req.command_length(), 1);
    }

    #[test]
    fn empty_array_is_invalid() {
        let v = RespValue::Array(Some(vec![]));
        let req = parse_command(&v, Bytes::from_static(b""));
        assert!(!req.valid);
    }

    #[test]
    fn integer_value_is_invalid() {
        let v = RespValue::Integer(5);
        let req = parse_command(&v, Bytes::from_static(b":5\r\n"));
        assert!(!req.valid);
    }
}
