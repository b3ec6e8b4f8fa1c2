/*
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
*/

//! Startup and shutdown wiring (spec §4.7): open the AOF, replay it
//! against keyspace 0, bind the listener, accept connections, and on a
//! shutdown signal drain and sync before exiting.

use log::info;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::Config;
use crate::corestore::Memstore;
use crate::dbnet::listener::Listener;
use crate::diskstore::{self, PersistenceLog};
use crate::util::error::SkyResult;

pub async fn run(config: Config) -> SkyResult<()> {
    let store = Arc::new(Memstore::new());
    let log = Arc::new(PersistenceLog::open(".")?);

    let replayed = diskstore::replay(&log, &store.active())?;
    info!("startup replay applied {replayed} command(s)");

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let flush_log = log.clone();
    let flush_task = tokio::spawn(flush_log.run_flush_loop());

    let listener = Listener::bind(config.port, store.active(), log.clone()).await?;
    let listener_shutdown = shutdown_tx.subscribe();
    let listener_task = tokio::spawn(listener.run(listener_shutdown));

    let _ = tokio::signal::ctrl_c().await;
    info!("received Ctrl-C, shutting down");
    let _ = shutdown_tx.send(());
    let _ = listener_task.await;

    log.shutdown();
    let _ = flush_task.await;
    info!("shutdown complete");
    Ok(())
}
