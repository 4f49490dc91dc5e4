//! # Peer Client
//!
//! Opens a short-lived connection to a peer, sends one JSON command line,
//! reads one JSON response line, closes. Used by the Replicator and the
//! Cluster Manager for HEARTBEAT/ELECTION/REPLICATE calls.
//!
//! Grounded on `join_primary`/`broadcast` in the teacher's
//! `bin/replica.rs`/`bin/primary.rs` (connect, write, read-or-drop), with a
//! bounded timeout added since this spec enforces a per-call RPC budget
//! (§4.4/§5) that the teacher's one-shot client never needed.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::wire::PeerMessage;

/// Send `message` to `addr` and return its parsed JSON response.
///
/// Connect, write, and read are each bounded by `timeout`, so the whole RPC
/// cannot exceed roughly `3 * timeout` even against a reachable-but-silent
/// peer (spec §5's per-call budget).
pub fn send(addr: &str, message: &PeerMessage, timeout: Duration) -> Result<Value> {
    let socket_addr = addr
        .to_socket_addrs()
        .with_context(|| format!("resolving {addr}"))?
        .next()
        .with_context(|| format!("no addresses resolved for {addr}"))?;
    let mut stream = TcpStream::connect_timeout(&socket_addr, timeout)
        .with_context(|| format!("connecting to {addr}"))?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    stream
        .write_all(line.as_bytes())
        .with_context(|| format!("writing to {addr}"))?;

    let mut reader = BufReader::new(stream);
    let mut response_line = String::new();
    reader
        .read_line(&mut response_line)
        .with_context(|| format!("reading response from {addr}"))?;
    if response_line.is_empty() {
        anyhow::bail!("connection to {addr} closed with no response");
    }

    serde_json::from_str(response_line.trim())
        .with_context(|| format!("parsing response from {addr}"))
}
