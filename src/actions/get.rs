/*
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
*/

//! `GET key` — fetch a STRING value, or an error/null.

use crate::actions::{ActionResult, WRONGTYPE_ERR};
use crate::corestore::Keyspace;
use crate::protocol::RespValue;

pub fn get(keyspace: &Keyspace, key: &[u8]) -> ActionResult<RespValue> {
    match keyspace.get(key) {
        Ok(Some(value)) => Ok(RespValue::bulk(value)),
        Ok(None) => Ok(RespValue::null_bulk()),
        Err(_wrongtype) => Ok(RespValue::error(WRONGTYPE_ERR.as_bytes())),
    }
}
