/*
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
*/

//! The accept loop (spec §4.7): binds the TCP listener, spawns one task
//! per accepted connection, and on shutdown stops accepting and waits for
//! the already-spawned connection tasks to drain.

use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

use crate::corestore::Keyspace;
use crate::dbnet::connection::Connection;
use crate::diskstore::PersistenceLog;
use crate::util::error::{Error, SkyResult};

/// Backoff applied after a transient `accept()` failure (e.g. the process
/// is out of file descriptors), grounded on the teacher's `BaseListener`
/// accept-loop backoff.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

pub struct Listener {
    tcp: TcpListener,
    keyspace: Arc<Keyspace>,
    log: Arc<PersistenceLog>,
}

impl Listener {
    pub async fn bind(port: u16, keyspace: Arc<Keyspace>, log: Arc<PersistenceLog>) -> SkyResult<Self> {
        let addr = format!("0.0.0.0:{port}");
        let tcp = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::io_extra(e, format!("binding to {addr}")))?;
        info!("listening on {addr}");
        Ok(Self { tcp, keyspace, log })
    }

    /// Accept connections until `shutdown` fires, then wait for every
    /// spawned connection task to finish on its own.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut tasks = JoinSet::new();
        loop {
            tokio::select! {
                accepted = self.tcp.accept() => {
                    match accepted {
                        Ok((socket, peer)) => {
                            info!("accepted connection from {peer}");
                            let conn = Connection::new(socket, self.keyspace.clone(), self.log.clone());
                            tasks.spawn(conn.run());
                        }
                        Err(e) => {
                            error!("accept() failed: {e}");
                            tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("shutdown signaled, no longer accepting connections");
                    break;
                }
            }
        }
        info!("draining {} connection task(s)", tasks.len());
        while tasks.join_next().await.is_some() {}
        info!("all connections drained");
    }
}
