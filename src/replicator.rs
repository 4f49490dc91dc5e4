//! # Replicator
//!
//! Fans a write out to every known SECONDARY after it has been applied
//! locally on the PRIMARY. Grounded on the teacher's `broadcast()` in
//! `bin/primary.rs` (iterate replicas, best-effort connect+write, swallow
//! errors), generalized to run off the request thread so replication I/O
//! never delays the client's response (spec §4.4).

use std::thread;

use crate::config;
use crate::peer_client;
use crate::store::Operation;
use crate::topology::{NodeInfo, Role};
use crate::wire::PeerMessage;
use serde_json::Value;

/// Replicate `operation key=value` to every peer in `peers` currently known
/// to be SECONDARY (spec §4.4), each send dispatched on its own background
/// thread so the caller returns immediately (spec §4.4: "must not block the
/// client").
pub fn replicate(peers: Vec<NodeInfo>, operation: Operation, key: String, value: Option<Value>) {
    for peer in peers.into_iter().filter(|p| p.role == Role::Secondary) {
        let key = key.clone();
        let value = value.clone();
        thread::spawn(move || {
            let msg = PeerMessage::Replicate {
                operation,
                key: key.clone(),
                value,
            };
            match peer_client::send(&peer.addr(), &msg, config::PEER_RPC_TIMEOUT) {
                Ok(resp) => {
                    if resp.get("status").and_then(|s| s.as_str()) != Some("OK") {
                        log::warn!(
                            "replication of '{}' to {} was not acknowledged: {:?}",
                            key,
                            peer.node_id,
                            resp
                        );
                    }
                }
                Err(e) => {
                    log::warn!("replication of '{}' to {} failed: {e:#}", key, peer.node_id);
                }
            }
        });
    }
}
