/*
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
*/

//! `SET key value` — store a STRING, overwriting any prior entry.

use crate::actions::ActionResult;
use crate::corestore::Keyspace;
use crate::protocol::RespValue;
use bytes::Bytes;

pub fn set(keyspace: &Keyspace, key: Bytes, value: Bytes) -> ActionResult<RespValue> {
    keyspace.set(key, value);
    Ok(RespValue::simple(&b"OK"[..]))
}
