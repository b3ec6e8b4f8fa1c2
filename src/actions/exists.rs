/*
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
*/

//! `EXISTS key [key ...]` — sum of presence across all listed keys
//! (spec §4.6's "sum across multiple keys if arity is extended").

use crate::actions::ActionResult;
use crate::corestore::Keyspace;
use crate::protocol::RespValue;
use bytes::Bytes;

pub fn exists(keyspace: &Keyspace, keys: &[Bytes]) -> ActionResult<RespValue> {
    let count = keys.iter().filter(|k| keyspace.exists(k)).count();
    Ok(RespValue::Integer(count as i64))
}
