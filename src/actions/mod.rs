/*
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
*/

//! # Actions
//!
//! Each action takes a [`crate::request::Request`] and the active
//! [`crate::corestore::Keyspace`], and returns the [`RespValue`] to send
//! back to the client directly (spec §9 "Dynamic-typed result value":
//! handlers return `RespValue` directly rather than an untyped union that
//! the encoder has to introspect).

pub mod del;
pub mod exists;
pub mod get;
pub mod keys;
pub mod ping;
pub mod set;

use crate::protocol::RespValue;
use std::io;

/// A generic result for actions.
pub type ActionResult<T> = Result<T, ActionError>;

/// Errors that can occur while running an action: either a message to
/// report to the client as a RESP Error (command stays open), or a fatal
/// I/O failure that should close the connection (spec §7).
#[derive(Debug)]
pub enum ActionError {
    ActionError(&'static str),
    IoError(io::Error),
}

impl From<&'static str> for ActionError {
    fn from(e: &'static str) -> Self {
        Self::ActionError(e)
    }
}

impl From<io::Error> for ActionError {
    fn from(e: io::Error) -> Self {
        Self::IoError(e)
    }
}

pub const WRONGTYPE_ERR: &str =
    "WRONGTYPE Operation against a key holding the wrong kind of value";

/// Render an [`ActionResult`] into the [`RespValue`] to write back to the
/// client. An `IoError` here is a bug in a handler (handlers never touch
/// sockets) so it is reported the same way a message error would be.
pub fn into_resp(result: ActionResult<RespValue>) -> RespValue {
    match result {
        Ok(v) => v,
        Err(ActionError::ActionError(msg)) => RespValue::error(msg.as_bytes()),
        Err(ActionError::IoError(e)) => RespValue::error(e.to_string().into_bytes()),
    }
}
