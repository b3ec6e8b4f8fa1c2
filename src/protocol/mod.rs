/*
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
*/

//! # RESP: REdis Serialization Protocol
//!
//! A stateless, allocation-light parser/encoder for the RESP wire format.
//! [`try_parse`] consumes as much of a byte buffer as it needs to produce one
//! complete [`RespValue`] and reports exactly how many bytes it consumed, so
//! that the caller (see [`crate::dbnet::connection`]) can both advance its
//! read buffer and capture the raw bytes for journaling (spec §4.5).

use bytes::Bytes;
use std::fmt;

#[cfg(test)]
mod tests;

/// Bulk strings (and, by extension, array lengths used as byte counts) may
/// not exceed this many bytes.
pub const MAX_BULK_LEN: i64 = 524_288_000;

/// A fully parsed RESP value.
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    SimpleString(Bytes),
    Error(Bytes),
    Integer(i64),
    /// `None` represents the RESP null bulk string (`$-1\r\n`)
    BulkString(Option<Bytes>),
    /// `None` represents the RESP null array (`*-1\r\n`)
    Array(Option<Vec<RespValue>>),
}

impl RespValue {
    pub fn null_bulk() -> Self {
        Self::BulkString(None)
    }
    pub fn null_array() -> Self {
        Self::Array(None)
    }
    pub fn bulk(b: impl Into<Bytes>) -> Self {
        Self::BulkString(Some(b.into()))
    }
    pub fn simple(s: impl Into<Bytes>) -> Self {
        Self::SimpleString(s.into())
    }
    pub fn error(s: impl Into<Bytes>) -> Self {
        Self::Error(s.into())
    }
}

/// Malformed RESP input. Always fatal to the connection that produced it
/// (spec §7: `ProtocolError`).
#[derive(Debug, PartialEq, Eq)]
pub enum ProtocolError {
    ShortLine,
    MissingCrlf,
    BadBulkLength,
    TruncatedBulk,
    BadInteger,
    BadArrayLength,
    /// The stream ended (no more bytes will ever arrive) while a value was
    /// still incomplete. Used by [`decode_complete`] and by replay, which
    /// reads from a file that will never grow further.
    UnexpectedEof,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortLine => write!(f, "line is too short"),
            Self::MissingCrlf => write!(f, "line is not terminated by CRLF"),
            Self::BadBulkLength => write!(f, "bulk string length out of range"),
            Self::TruncatedBulk => write!(f, "bulk string payload not followed by CRLF"),
            Self::BadInteger => write!(f, "invalid integer"),
            Self::BadArrayLength => write!(f, "invalid array length"),
            Self::UnexpectedEof => write!(f, "value was truncated before completion"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Result of attempting to parse one value out of a byte buffer.
pub enum ParseOutcome {
    /// Not enough bytes buffered yet; the caller should read more and retry.
    Incomplete,
    /// A complete value, and the number of leading bytes of the buffer it
    /// consumed (the exact, literal bytes to journal verbatim).
    Value(RespValue, usize),
}

/// Find the first bare LF in `buf` and validate that it is preceded by a CR.
///
/// Returns `Ok(None)` if no LF has arrived yet (need more bytes), `Ok(Some(lf_index))`
/// on a well formed CRLF-terminated line, or an error if an LF shows up without a
/// preceding CR (e.g. `"+OK\n"`).
fn find_line_end(buf: &[u8]) -> Result<Option<usize>, ProtocolError> {
    match buf.iter().position(|&b| b == b'\n') {
        None => Ok(None),
        Some(0) => Err(ProtocolError::MissingCrlf),
        Some(idx) => {
            if buf[idx - 1] == b'\r' {
                Ok(Some(idx))
            } else {
                Err(ProtocolError::MissingCrlf)
            }
        }
    }
}

/// Attempt to parse exactly one RESP value from the head of `buf`.
///
/// This function borrows `buf` only; callers own buffering and advancement.
pub fn try_parse(buf: &[u8]) -> Result<ParseOutcome, ProtocolError> {
    if buf.is_empty() {
        return Ok(ParseOutcome::Incomplete);
    }
    let lf = match find_line_end(buf)? {
        None => return Ok(ParseOutcome::Incomplete),
        Some(lf) => lf,
    };
    // total bytes of the line itself: prefix + content + CRLF
    if lf + 1 < 3 {
        return Err(ProtocolError::ShortLine);
    }
    let prefix = buf[0];
    let content = &buf[1..lf - 1];
    let line_len = lf + 1;

    match prefix {
        b'+' => Ok(ParseOutcome::Value(
            RespValue::SimpleString(Bytes::copy_from_slice(content)),
            line_len,
        )),
        b'-' => Ok(ParseOutcome::Value(
            RespValue::Error(Bytes::copy_from_slice(content)),
            line_len,
        )),
        b':' => {
            let n = parse_i64(content).ok_or(ProtocolError::BadInteger)?;
            Ok(ParseOutcome::Value(RespValue::Integer(n), line_len))
        }
        b'$' => parse_bulk_string(buf, content, line_len),
        b'*' => parse_array(buf, content, line_len),
        _ => {
            // Permissive inline mode: the whole line (prefix included) is the value.
            let whole = &buf[0..lf - 1];
            Ok(ParseOutcome::Value(
                RespValue::SimpleString(Bytes::copy_from_slice(whole)),
                line_len,
            ))
        }
    }
}

fn parse_i64(content: &[u8]) -> Option<i64> {
    std::str::from_utf8(content).ok()?.parse::<i64>().ok()
}

fn parse_bulk_string(
    buf: &[u8],
    len_content: &[u8],
    line_len: usize,
) -> Result<ParseOutcome, ProtocolError> {
    let len = parse_i64(len_content).ok_or(ProtocolError::BadBulkLength)?;
    if len == -1 {
        return Ok(ParseOutcome::Value(RespValue::BulkString(None), line_len));
    }
    if len < -1 || len > MAX_BULK_LEN {
        return Err(ProtocolError::BadBulkLength);
    }
    let len = len as usize;
    let needed = line_len + len + 2;
    if buf.len() < needed {
        return Ok(ParseOutcome::Incomplete);
    }
    let payload = &buf[line_len..line_len + len];
    if buf[line_len + len] != b'\r' || buf[line_len + len + 1] != b'\n' {
        return Err(ProtocolError::TruncatedBulk);
    }
    Ok(ParseOutcome::Value(
        RespValue::BulkString(Some(Bytes::copy_from_slice(payload))),
        needed,
    ))
}

fn parse_array(
    buf: &[u8],
    len_content: &[u8],
    line_len: usize,
) -> Result<ParseOutcome, ProtocolError> {
    let len = parse_i64(len_content).ok_or(ProtocolError::BadArrayLength)?;
    if len == -1 {
        return Ok(ParseOutcome::Value(RespValue::Array(None), line_len));
    }
    if len < -1 {
        return Err(ProtocolError::BadArrayLength);
    }
    let count = len as usize;
    let mut items = Vec::with_capacity(count.min(4096));
    let mut consumed = line_len;
    for _ in 0..count {
        match try_parse(&buf[consumed..])? {
            ParseOutcome::Incomplete => return Ok(ParseOutcome::Incomplete),
            ParseOutcome::Value(v, n) => {
                items.push(v);
                consumed += n;
            }
        }
    }
    Ok(ParseOutcome::Value(RespValue::Array(Some(items)), consumed))
}

/// Parse a value from a buffer that is known to never receive more bytes
/// (a closed connection, or the tail of a replay file). Unlike [`try_parse`],
/// a partial value here is a genuine [`ProtocolError::UnexpectedEof`] rather
/// than a request to wait for more input.
pub fn decode_complete(buf: &[u8]) -> Result<(RespValue, usize), ProtocolError> {
    match try_parse(buf)? {
        ParseOutcome::Value(v, n) => Ok((v, n)),
        ParseOutcome::Incomplete => Err(ProtocolError::UnexpectedEof),
    }
}

/// Encoding errors: attempting to encode a value that would violate the
/// wire format's own constraints (spec §4.1).
#[derive(Debug, PartialEq, Eq)]
pub enum EncodeError {
    ContainsCrLf,
    BulkTooLarge,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContainsCrLf => write!(f, "value contains a CR or LF byte"),
            Self::BulkTooLarge => write!(f, "bulk string exceeds the maximum length"),
        }
    }
}

impl std::error::Error for EncodeError {}

pub fn encode_simple_string(s: &[u8]) -> Result<Vec<u8>, EncodeError> {
    if s.contains(&b'\r') || s.contains(&b'\n') {
        return Err(EncodeError::ContainsCrLf);
    }
    let mut out = Vec::with_capacity(s.len() + 3);
    out.push(b'+');
    out.extend_from_slice(s);
    out.extend_from_slice(b"\r\n");
    Ok(out)
}

pub fn encode_error(s: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() + 3);
    out.push(b'-');
    out.extend_from_slice(s);
    out.extend_from_slice(b"\r\n");
    out
}

pub fn encode_integer(i: i64) -> Vec<u8> {
    format!(":{i}\r\n").into_bytes()
}

pub fn encode_bulk_string(b: &[u8]) -> Result<Vec<u8>, EncodeError> {
    if b.len() as i64 > MAX_BULK_LEN {
        return Err(EncodeError::BulkTooLarge);
    }
    let mut out = Vec::with_capacity(b.len() + 16);
    out.extend_from_slice(format!("${}\r\n", b.len()).as_bytes());
    out.extend_from_slice(b);
    out.extend_from_slice(b"\r\n");
    Ok(out)
}

pub fn encode_null_bulk() -> Vec<u8> {
    b"$-1\r\n".to_vec()
}

pub fn encode_null_array() -> Vec<u8> {
    b"*-1\r\n".to_vec()
}

pub fn encode_array(children: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(format!("*{}\r\n", children.len()).as_bytes());
    for child in children {
        out.extend_from_slice(child);
    }
    out
}

/// Encode a full [`RespValue`] tree, recursing through arrays.
pub fn encode(value: &RespValue) -> Result<Vec<u8>, EncodeError> {
    match value {
        RespValue::SimpleString(s) => encode_simple_string(s),
        RespValue::Error(s) => Ok(encode_error(s)),
        RespValue::Integer(i) => Ok(encode_integer(*i)),
        RespValue::BulkString(Some(b)) => encode_bulk_string(b),
        RespValue::BulkString(None) => Ok(encode_null_bulk()),
        RespValue::Array(Some(items)) => {
            let mut children = Vec::with_capacity(items.len());
            for item in items {
                children.push(encode(item)?);
            }
            Ok(encode_array(&children))
        }
        RespValue::Array(None) => Ok(encode_null_array()),
    }
}
