/*
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
*/

pub mod error;

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// Used by the keyspace to stamp and check key expiry (spec §4.4.1).
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub mod compiler {
    //! Branch hints. Kept to a minimum: only used on the hot path of
    //! keyspace lookups where the teacher also reaches for them.
    #[cold]
    fn cold() {}

    #[inline]
    pub fn likely(b: bool) -> bool {
        if !b {
            cold();
        }
        b
    }
}
