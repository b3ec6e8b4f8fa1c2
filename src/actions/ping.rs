/*
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
*/

//! `PING` — always replies `+PONG`.

use crate::actions::ActionResult;
use crate::protocol::RespValue;

pub fn ping() -> ActionResult<RespValue> {
    Ok(RespValue::simple(&b"PONG"[..]))
}
