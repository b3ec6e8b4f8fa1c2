/*
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
*/

//! Networking: the accept loop and per-connection request/reply cycle
//! (spec §4.6, §4.7).

pub mod connection;
pub mod listener;
