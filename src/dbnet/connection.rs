/*
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
*/

//! One task per accepted TCP connection (spec §4.6). A connection is
//! strictly sequential: read one value, dispatch, write the reply, repeat.
//! No pipelining is attempted, though the codec tolerates it.

use bytes::{Bytes, BytesMut};
use log::{debug, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::actions;
use crate::command_table;
use crate::corestore::Keyspace;
use crate::diskstore::PersistenceLog;
use crate::protocol::{self, ParseOutcome, RespValue};
use crate::request::{self, Request};

use std::sync::Arc;

const INITIAL_BUFFER_CAPACITY: usize = 4096;

pub struct Connection {
    socket: TcpStream,
    buffer: BytesMut,
    keyspace: Arc<Keyspace>,
    log: Arc<PersistenceLog>,
}

impl Connection {
    pub fn new(socket: TcpStream, keyspace: Arc<Keyspace>, log: Arc<PersistenceLog>) -> Self {
        Self {
            socket,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            keyspace,
            log,
        }
    }

    /// Drive the connection until the client disconnects, sends STOP/QUIT,
    /// or a protocol error closes the stream.
    pub async fn run(mut self) {
        loop {
            let (value, raw) = match self.read_one().await {
                Ok(Some(v)) => v,
                Ok(None) => return,
                Err(e) => {
                    warn!("connection I/O error: {e}");
                    return;
                }
            };

            if is_disconnect_sentinel(&value) {
                debug!("client sent STOP/QUIT, closing connection");
                return;
            }

            let reply = self.dispatch(&value, raw);
            let encoded = match protocol::encode(&reply) {
                Ok(bytes) => bytes,
                Err(e) => protocol::encode_error(format!("ERR {e}").as_bytes()),
            };
            if let Err(e) = self.socket.write_all(&encoded).await {
                warn!("connection write error: {e}");
                return;
            }
        }
    }

    /// Decode exactly one RESP value, reading more bytes from the socket
    /// as needed. `Ok(None)` means the connection closed cleanly (or with
    /// a truncated trailing frame, treated the same way at the transport
    /// boundary). A decode error closes the connection (spec §4.6 step 2).
    async fn read_one(&mut self) -> std::io::Result<Option<(RespValue, Bytes)>> {
        loop {
            match protocol::try_parse(&self.buffer) {
                Ok(ParseOutcome::Value(value, consumed)) => {
                    let raw = self.buffer.split_to(consumed).freeze();
                    return Ok(Some((value, raw)));
                }
                Ok(ParseOutcome::Incomplete) => {
                    let n = self.socket.read_buf(&mut self.buffer).await?;
                    if n == 0 {
                        return Ok(None);
                    }
                }
                Err(e) => {
                    debug!("protocol error, closing connection: {e}");
                    return Ok(None);
                }
            }
        }
    }

    /// Steps 4-9 of spec §4.6: parse the request, validate it against the
    /// command table, journal it if it's a write, and invoke its handler.
    fn dispatch(&self, value: &RespValue, raw: Bytes) -> RespValue {
        let req = request::parse_command(value, raw);
        if !req.valid {
            return RespValue::null_bulk();
        }

        let spec = match command_table::lookup(&req.command) {
            Some(spec) => spec,
            None => return RespValue::error(format!("ERR unknown command '{}'", req.command)),
        };
        if !spec.arity_ok(req.command_length()) {
            return RespValue::error(b"ERR wrong number of arguments".to_vec());
        }
        if spec.flags.contains(command_table::CommandFlags::WRITE) {
            self.log.append_raw(&req.raw);
        }

        actions::into_resp(run_handler(&req, &self.keyspace))
    }
}

fn is_disconnect_sentinel(value: &RespValue) -> bool {
    matches!(
        value,
        RespValue::SimpleString(s)
            if s.eq_ignore_ascii_case(b"STOP") || s.eq_ignore_ascii_case(b"QUIT")
    )
}

fn run_handler(req: &Request, keyspace: &Keyspace) -> actions::ActionResult<RespValue> {
    match req.command.as_str() {
        "PING" => actions::ping::ping(),
        "GET" => actions::get::get(keyspace, &req.key),
        "SET" => {
            let value = req.args.first().cloned().unwrap_or_default();
            actions::set::set(keyspace, req.key.clone(), value)
        }
        "DEL" => {
            let keys = all_keys(req);
            actions::del::del(keyspace, &keys)
        }
        "EXISTS" => {
            let keys = all_keys(req);
            actions::exists::exists(keyspace, &keys)
        }
        "KEYS" => actions::keys::keys(keyspace, &req.key),
        // Unreachable in practice: `dispatch` only calls into here after a
        // successful command_table lookup, and the table only names the
        // six commands matched above.
        _ => Err("ERR unimplemented command".into()),
    }
}

/// The key plus any trailing args, for the variadic `DEL`/`EXISTS`.
fn all_keys(req: &Request) -> Vec<Bytes> {
    let mut keys = Vec::with_capacity(1 + req.args.len());
    if req.key_present {
        keys.push(req.key.clone());
    }
    keys.extend(req.args.iter().cloned());
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diskstore::PersistenceLog;
    use tokio::net::TcpListener;

    /// A throwaway directory for one test's AOF file, removed on drop.
    struct TempDir(std::path::PathBuf);
    impl AsRef<std::path::Path> for TempDir {
        fn as_ref(&self) -> &std::path::Path {
            &self.0
        }
    }
    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }
    fn tempdir(tag: &str) -> TempDir {
        let mut path = std::env::temp_dir();
        path.push(format!("rresp-conn-test-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&path).unwrap();
        TempDir(path)
    }

    /// Spin up one server connection task wired to a fresh keyspace and
    /// AOF, return a connected client stream to drive it with.
    async fn serve_one(tag: &str) -> TcpStream {
        let dir = tempdir(tag);
        let keyspace = Arc::new(Keyspace::new());
        let log = Arc::new(PersistenceLog::open(&dir).unwrap());
        drop(dir); // the open fd keeps working even once the dir entry is gone

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            Connection::new(socket, keyspace, log).run().await;
        });
        TcpStream::connect(addr).await.unwrap()
    }

    async fn read_reply(client: &mut TcpStream) -> Vec<u8> {
        let mut buf = vec![0u8; 1024];
        let n = client.read(&mut buf).await.unwrap();
        buf.truncate(n);
        buf
    }

    #[tokio::test]
    async fn ping_round_trip() {
        let mut client = serve_one("ping").await;
        client.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
        assert_eq!(read_reply(&mut client).await, b"+PONG\r\n");
    }

    #[tokio::test]
    async fn set_then_get_round_trip() {
        let mut client = serve_one("set-get").await;
        client
            .write_all(b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n")
            .await
            .unwrap();
        assert_eq!(read_reply(&mut client).await, b"+OK\r\n");
        client
            .write_all(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n")
            .await
            .unwrap();
        assert_eq!(read_reply(&mut client).await, b"$3\r\nbar\r\n");
    }

    #[tokio::test]
    async fn stop_sentinel_closes_connection() {
        let mut client = serve_one("stop").await;
        client.write_all(b"STOP\r\n").await.unwrap();
        let mut buf = [0u8; 16];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(n, 0, "server should close the connection with no reply");
    }
}
