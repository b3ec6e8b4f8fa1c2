/*
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
*/

//! `DEL key [key ...]` — remove each listed key if present, return the
//! count actually removed.

use crate::actions::ActionResult;
use crate::corestore::Keyspace;
use crate::protocol::RespValue;
use bytes::Bytes;

pub fn del(keyspace: &Keyspace, keys: &[Bytes]) -> ActionResult<RespValue> {
    Ok(RespValue::Integer(keyspace.del(keys) as i64))
}
