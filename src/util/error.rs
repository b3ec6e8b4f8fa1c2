/*
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
*/

use std::{fmt, io};

/// Top level result type for startup and background-service code
pub type SkyResult<T> = Result<T, Error>;

/// Fatal errors: these terminate the process (config/bind failures) or a
/// single connection (I/O failures), never a single command
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    IoExtra(io::Error, String),
    Config(String),
    Storage(String),
}

impl Error {
    pub fn io_extra(ioe: io::Error, extra: impl ToString) -> Self {
        Self::IoExtra(ioe, extra.to_string())
    }
    pub fn config(msg: impl ToString) -> Self {
        Self::Config(msg.to_string())
    }
    pub fn storage(msg: impl ToString) -> Self {
        Self::Storage(msg.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::IoExtra(e, extra) => write!(f, "I/O error while {extra}: {e}"),
            Self::Config(e) => write!(f, "configuration error: {e}"),
            Self::Storage(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
