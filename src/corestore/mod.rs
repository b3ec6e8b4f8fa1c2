/*
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
*/

//! The in-memory keyspace (spec §4.4): a typed map from opaque byte-string
//! keys to [`ValueEntry`] records, with lazy expiry. Guarded by a single
//! `parking_lot::RwLock`, matching the teacher's preference for
//! `parking_lot` locks over a custom lock-free map where a plain map
//! already satisfies the linearizability requirement (spec §5).

use bytes::Bytes;
use parking_lot::RwLock;
use regex::bytes::Regex;
use std::collections::HashMap;

use crate::util::compiler;
use crate::util::now_ms;

/// Tags the kind of value a [`ValueEntry`] holds. Only `String` is
/// implemented; the rest are placeholders so future handlers can branch on
/// type without a schema change (spec §4.4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    String = 0,
    List = 1,
    Set = 2,
    ZSet = 3,
    Hash = 4,
}

/// A keyspace record.
#[derive(Debug, Clone)]
pub struct ValueEntry {
    pub payload: Payload,
    /// Absolute expiry in milliseconds since epoch; 0 means "never expires".
    pub expires_at: i64,
    pub type_tag: TypeTag,
}

#[derive(Debug, Clone)]
pub enum Payload {
    String(Bytes),
    List(Vec<Bytes>),
    Set(Vec<Bytes>),
    SortedSet,
    Hash,
}

impl ValueEntry {
    fn string(value: Bytes) -> Self {
        Self {
            payload: Payload::String(value),
            expires_at: 0,
            type_tag: TypeTag::String,
        }
    }

    fn is_expired(&self, now: i64) -> bool {
        self.expires_at != 0 && now >= self.expires_at
    }
}

/// Signaled when a typed operation is applied to a key holding a different
/// type (spec §4.4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrongType;

/// Remove `key` from `map` if it's there, reporting whether it counted as
/// present (i.e. not already expired) at the moment of removal. Used by
/// [`Keyspace::del`] to apply lazy expiry and removal atomically.
fn remove_if_present(map: &mut HashMap<Bytes, ValueEntry>, key: &[u8], now: i64) -> bool {
    match map.get(key) {
        None => false,
        Some(entry) => {
            let was_present = !entry.is_expired(now);
            map.remove(key);
            was_present
        }
    }
}

/// One logical database. The server keeps a fixed-size array of these
/// (spec §3, §9 "Multi-DB array") but only index 0 is ever active.
#[derive(Default)]
pub struct Keyspace {
    map: RwLock<HashMap<Bytes, ValueEntry>>,
}

impl Keyspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a STRING entry, overwriting any prior entry regardless of type.
    pub fn set(&self, key: Bytes, value: Bytes) {
        self.map.write().insert(key, ValueEntry::string(value));
    }

    /// `Get(key) -> (value, present)`, applying lazy expiry first. The
    /// expiry check and the removal of a stale entry happen under one held
    /// write lock (spec §5: no check-then-act race with a concurrent `set`
    /// on the same key).
    pub fn get(&self, key: &[u8]) -> Result<Option<Bytes>, WrongType> {
        let now = now_ms();
        let mut guard = self.map.write();
        let expired = match guard.get(key) {
            None => return Ok(None),
            Some(entry) => entry.is_expired(now),
        };
        if compiler::likely(!expired) {
            return match &guard.get(key).unwrap().payload {
                Payload::String(b) => Ok(Some(b.clone())),
                _ => Err(WrongType),
            };
        }
        guard.remove(key);
        Ok(None)
    }

    /// `Exists(key) -> {0,1}`, applying lazy expiry under one held write
    /// lock, same discipline as [`Keyspace::get`].
    pub fn exists(&self, key: &[u8]) -> bool {
        let now = now_ms();
        let mut guard = self.map.write();
        let expired = match guard.get(key) {
            None => return false,
            Some(entry) => entry.is_expired(now),
        };
        if compiler::likely(!expired) {
            true
        } else {
            guard.remove(key);
            false
        }
    }

    /// `Del(keys...) -> count` of keys actually removed. A key that is
    /// physically present but already expired is removed (lazily) but not
    /// counted, keeping `del`'s notion of presence consistent with
    /// `get`/`exists` (spec §3).
    pub fn del(&self, keys: &[Bytes]) -> usize {
        let now = now_ms();
        let mut guard = self.map.write();
        keys.iter()
            .filter(|k| remove_if_present(&mut guard, k, now))
            .count()
    }

    /// `Keys(pattern) -> seq of keys` matching a compiled regular
    /// expression, in unspecified order (spec §4.4). Expired entries are
    /// filtered out but not proactively removed (lazy expiry is
    /// access-driven, not scan-driven).
    pub fn keys(&self, pattern: &str) -> Result<Vec<Bytes>, regex::Error> {
        let re = Regex::new(pattern)?;
        let now = now_ms();
        let guard = self.map.read();
        Ok(guard
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .filter(|(k, _)| re.is_match(k))
            .map(|(k, _)| k.clone())
            .collect())
    }

    /// Test-only injection of a non-STRING entry, to exercise WRONGTYPE.
    #[cfg(test)]
    pub fn inject_list(&self, key: Bytes) {
        self.map.write().insert(
            key,
            ValueEntry {
                payload: Payload::List(Vec::new()),
                expires_at: 0,
                type_tag: TypeTag::List,
            },
        );
    }

    #[cfg(test)]
    pub fn set_with_expiry(&self, key: Bytes, value: Bytes, expires_at: i64) {
        self.map.write().insert(
            key,
            ValueEntry {
                payload: Payload::String(value),
                expires_at,
                type_tag: TypeTag::String,
            },
        );
    }
}

/// Fixed-capacity array of keyspaces (spec §9 "Multi-DB array"): only index
/// 0 is ever active, but the shape is kept so a future `SELECT` slots in
/// without a schema change.
pub const KEYSPACE_COUNT: usize = 15;

pub struct Memstore {
    pub keyspaces: [std::sync::Arc<Keyspace>; KEYSPACE_COUNT],
}

impl Memstore {
    pub fn new() -> Self {
        Self {
            keyspaces: std::array::from_fn(|_| std::sync::Arc::new(Keyspace::new())),
        }
    }

    /// A cheap, shareable handle to the only active keyspace.
    pub fn active(&self) -> std::sync::Arc<Keyspace> {
        self.keyspaces[0].clone()
    }
}

impl Default for Memstore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn set_then_get_round_trips() {
        let ks = Keyspace::new();
        ks.set(b("k"), b("v"));
        assert_eq!(ks.get(b"k").unwrap(), Some(b("v")));
    }

    #[test]
    fn set_overwrites_prior_entry() {
        let ks = Keyspace::new();
        ks.set(b("k"), b("v1"));
        ks.set(b("k"), b("v2"));
        assert_eq!(ks.get(b"k").unwrap(), Some(b("v2")));
    }

    #[test]
    fn get_on_absent_key_returns_none() {
        let ks = Keyspace::new();
        assert_eq!(ks.get(b"missing").unwrap(), None);
    }

    #[test]
    fn exists_reflects_presence() {
        let ks = Keyspace::new();
        assert!(!ks.exists(b"k"));
        ks.set(b("k"), b("v"));
        assert!(ks.exists(b"k"));
    }

    #[test]
    fn expired_entry_is_lazily_removed() {
        let ks = Keyspace::new();
        ks.set_with_expiry(b("k"), b("v"), 1);
        assert_eq!(ks.get(b"k").unwrap(), None);
        assert!(!ks.exists(b"k"));
    }

    #[test]
    fn zero_expiry_never_expires() {
        let ks = Keyspace::new();
        ks.set_with_expiry(b("k"), b("v"), 0);
        assert_eq!(ks.get(b"k").unwrap(), Some(b("v")));
    }

    #[test]
    fn wrongtype_on_non_string_entry() {
        let ks = Keyspace::new();
        ks.inject_list(b("k"));
        assert_eq!(ks.get(b"k"), Err(WrongType));
    }

    #[test]
    fn del_removes_listed_keys_and_counts() {
        let ks = Keyspace::new();
        ks.set(b("a"), b("1"));
        ks.set(b("b"), b("2"));
        let removed = ks.del(&[b("a"), b("b"), b("c")]);
        assert_eq!(removed, 2);
        assert!(!ks.exists(b"a"));
        assert!(!ks.exists(b"b"));
    }

    #[test]
    fn del_does_not_count_an_already_expired_key() {
        let ks = Keyspace::new();
        ks.set_with_expiry(b("a"), b("1"), 1);
        ks.set(b("b"), b("2"));
        let removed = ks.del(&[b("a"), b("b")]);
        assert_eq!(removed, 1);
        assert!(!ks.exists(b"a"));
    }

    #[test]
    fn keys_matches_regex_pattern() {
        let ks = Keyspace::new();
        ks.set(b("a"), b("1"));
        ks.set(b("b"), b("2"));
        let mut matched: Vec<String> = ks
            .keys(".")
            .unwrap()
            .into_iter()
            .map(|k| String::from_utf8(k.to_vec()).unwrap())
            .collect();
        matched.sort();
        assert_eq!(matched, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn memstore_only_index_zero_is_active() {
        let store = Memstore::new();
        assert_eq!(store.keyspaces.len(), KEYSPACE_COUNT);
        store.active().set(b("k"), b("v"));
        assert_eq!(store.keyspaces[0].get(b"k").unwrap(), Some(b("v")));
    }
}
