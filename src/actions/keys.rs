/*
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
*/

//! `KEYS pattern` — keys matching a regular expression, in unspecified
//! order (spec §4.4; the regex dialect is this crate's own, documented in
//! `DESIGN.md` per spec §9's "Regex dialect for KEYS" redesign flag).

use crate::actions::ActionResult;
use crate::corestore::Keyspace;
use crate::protocol::RespValue;

pub fn keys(keyspace: &Keyspace, pattern: &[u8]) -> ActionResult<RespValue> {
    let pattern = std::str::from_utf8(pattern).map_err(|_| "ERR pattern is not valid UTF-8")?;
    let matches = keyspace
        .keys(pattern)
        .map_err(|_| "ERR invalid regular expression")?;
    let items = matches.into_iter().map(RespValue::bulk).collect();
    Ok(RespValue::Array(Some(items)))
}
