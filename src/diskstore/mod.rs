/*
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
*/

//! The append-only persistence log (spec §4.5). `appendonly.aof` is a flat
//! concatenation of RESP-encoded mutating commands, no header, no
//! checksum. Writes are serialized behind a single mutex (spec §5: "a
//! single append mutex is acceptable"); a background task syncs the file
//! to disk every 3 seconds, grounded on the original's
//! `Persistance.flush` (`cache/persistance.go`: sleep 3s, `Sync()`, loop).

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::Duration;

use crate::corestore::Keyspace;
use crate::protocol::{self, ProtocolError};
use crate::request;
use crate::util::error::{Error, SkyResult};

/// Literal filename mandated by spec §6.
pub const AOF_FILE_NAME: &str = "appendonly.aof";

/// Nominal background-sync interval (spec §4.5, §5).
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(3);

/// Owns the single append-only file handle shared by every connection.
pub struct PersistenceLog {
    path: PathBuf,
    file: Mutex<File>,
    shutdown: Notify,
}

impl PersistenceLog {
    /// Open (or create) the AOF in the given directory.
    pub fn open(dir: impl AsRef<Path>) -> SkyResult<Self> {
        let path = dir.as_ref().join(AOF_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)
            .map_err(|e| Error::io_extra(e, format!("opening {}", path.display())))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
            shutdown: Notify::new(),
        })
    }

    /// Append one command's raw, already-encoded bytes. Atomic at the
    /// granularity of a single command (spec §5): the whole write happens
    /// under the append mutex. A failed write is logged and swallowed
    /// (spec §7: best-effort durability, the server keeps running).
    pub fn append_raw(&self, raw: &[u8]) {
        let mut file = self.file.lock();
        if let Err(e) = file.write_all(raw) {
            error!("failed to append to {}: {e}", self.path.display());
        }
    }

    /// Issue an OS-level sync without holding the append mutex across it
    /// (spec §5: "must not hold the append mutex across the sync").
    fn sync(&self) {
        let file = self.file.lock().try_clone();
        match file {
            Ok(f) => {
                if let Err(e) = f.sync_data() {
                    warn!("AOF sync failed: {e}");
                }
            }
            Err(e) => warn!("could not clone AOF handle for sync: {e}"),
        }
    }

    /// Run the background flush loop until shutdown is signaled. Intended
    /// to be spawned as its own task (spec §9 "Background flush as
    /// co-scheduled task").
    pub async fn run_flush_loop(self: Arc<Self>) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(FLUSH_INTERVAL) => {
                    self.sync();
                    debug!("AOF flushed");
                }
                _ = self.shutdown.notified() => {
                    self.sync();
                    info!("AOF flush loop shutting down");
                    return;
                }
            }
        }
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

/// Replay the AOF against `keyspace`, re-executing every decoded command
/// in file order. A decode error ends replay without aborting startup
/// (spec §4.5, §7): the log's tail may be a partial frame left by a
/// crash mid-write.
///
/// Only commands the active command table marks `WRITE` have any effect;
/// everything else (reads, inline sentinels) is parsed and discarded,
/// matching "replay ignores read commands" (spec §8).
pub fn replay(log: &PersistenceLog, keyspace: &Keyspace) -> SkyResult<usize> {
    let mut buf = Vec::new();
    {
        let mut file = log.file.lock();
        file.seek(SeekFrom::Start(0))
            .map_err(|e| Error::io_extra(e, "seeking AOF for replay"))?;
        file.read_to_end(&mut buf)
            .map_err(|e| Error::io_extra(e, "reading AOF for replay"))?;
    }

    let mut applied = 0usize;
    let mut cursor = 0usize;
    while cursor < buf.len() {
        match protocol::try_parse(&buf[cursor..]) {
            Ok(protocol::ParseOutcome::Value(value, consumed)) => {
                let req = request::parse_command(&value, bytes::Bytes::new());
                if req.valid && apply_replayed(keyspace, &req) {
                    applied += 1;
                }
                cursor += consumed;
            }
            Ok(protocol::ParseOutcome::Incomplete) | Err(ProtocolError::UnexpectedEof) => {
                warn!("AOF replay stopped at a truncated tail frame (offset {cursor})");
                break;
            }
            Err(e) => {
                warn!("AOF replay stopped at a decode error at offset {cursor}: {e}");
                break;
            }
        }
    }
    info!("AOF replay applied {applied} command(s)");
    Ok(applied)
}

/// Apply one replayed request directly to the keyspace, bypassing the
/// writer entirely (spec §4.5: "replay must not re-append"). Returns
/// whether the command actually mutated the keyspace (spec §8: "replay
/// ignores read commands").
fn apply_replayed(keyspace: &Keyspace, req: &request::Request) -> bool {
    match req.command.as_str() {
        "SET" => {
            if let Some(value) = req.args.first() {
                keyspace.set(req.key.clone(), value.clone());
                true
            } else {
                false
            }
        }
        "DEL" => {
            let mut keys = Vec::with_capacity(1 + req.args.len());
            if req.key_present {
                keys.push(req.key.clone());
            }
            keys.extend(req.args.iter().cloned());
            keyspace.del(&keys) > 0
        }
        _ => false,
    }
}
