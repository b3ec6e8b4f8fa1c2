/*
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
*/

//! rresp: a network-accessible in-memory key-value store speaking RESP,
//! with append-only persistence.

mod actions;
mod arbiter;
mod command_table;
mod config;
mod corestore;
mod dbnet;
mod diskstore;
mod protocol;
mod request;
mod util;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

fn main() {
    let env = env_logger::Env::default().filter_or("RRESP_LOG", "info");
    env_logger::Builder::from_env(env).init();

    let config = config::Config::from_args(std::env::args());

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start the async runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(arbiter::run(config)) {
        log::error!("fatal startup error: {e}");
        std::process::exit(1);
    }
}
