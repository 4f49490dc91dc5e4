//! # Listener / Session Layer
//!
//! Binds the shared TCP listener and runs one session per accepted
//! connection. Grounded on the teacher's `start_primary_server` +
//! `handle_connection` (`TcpListener::bind`, `for stream in
//! listener.incoming()`, `thread::spawn` per connection), generalized from
//! "read one fixed buffer, reply once, drop" into a persistent
//! newline-delimited read loop using `BufReader::read_line`, the same
//! method the teacher's own `join_primary` already uses for its
//! snapshot-reading loop.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use crate::cluster::ClusterManager;
use crate::handler;
use crate::store::KVStore;
use crate::wire::{self, Request, Response};

/// Read buffer capacity: generous per spec §4.2 ("≥4 KiB").
const READ_BUFFER_CAPACITY: usize = 8 * 1024;

/// Bind `addr` and accept connections until `SHUTDOWN` terminates the
/// process. Each connection runs independently on its own thread; shared
/// state is reached only through `store` and `cluster`.
pub fn run_listener(
    addr: &str,
    node_id: String,
    store: Arc<KVStore>,
    cluster: Arc<ClusterManager>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)?;
    log::info!("node {node_id} listening on {addr}");

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let node_id = node_id.clone();
                let store = store.clone();
                let cluster = cluster.clone();
                thread::spawn(move || run_session(stream, &node_id, &store, &cluster));
            }
            Err(e) => log::warn!("failed to accept connection: {e}"),
        }
    }
    Ok(())
}

/// Serve one connection: read newline-delimited requests and write exactly
/// one JSON response per request, in order, until disconnect or I/O error.
fn run_session(stream: TcpStream, node_id: &str, store: &Arc<KVStore>, cluster: &Arc<ClusterManager>) {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let read_half = match stream.try_clone() {
        Ok(s) => s,
        Err(e) => {
            log::warn!("failed to clone stream for {peer_addr}: {e}");
            return;
        }
    };
    let mut reader = BufReader::with_capacity(READ_BUFFER_CAPACITY, read_half);
    let mut writer = stream;

    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                log::debug!("session with {peer_addr} closed: {e}");
                break;
            }
        }

        let response = match wire::parse_line(&line) {
            Ok(Request::Client(cmd)) => {
                let outcome = handler::handle_client(cmd, node_id, store, cluster);
                if outcome.shutdown {
                    if let Err(e) = write_response(&mut writer, &outcome.response) {
                        log::warn!("failed writing shutdown response to {peer_addr}: {e}");
                    }
                    log::info!("node {node_id} shutting down at the request of {peer_addr}");
                    std::process::exit(0);
                }
                outcome.response
            }
            Ok(Request::Peer(msg)) => handler::handle_peer(msg, store, cluster),
            Err(reason) => Response::error(reason.to_string()),
        };

        if let Err(e) = write_response(&mut writer, &response) {
            log::debug!("failed writing response to {peer_addr}: {e}");
            break;
        }
    }
}

fn write_response(writer: &mut TcpStream, response: &serde_json::Value) -> std::io::Result<()> {
    let mut line = serde_json::to_string(response).expect("response always serializes");
    line.push('\n');
    writer.write_all(line.as_bytes())?;
    writer.flush()
}
