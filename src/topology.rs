//! # Peer Records
//!
//! Types describing what the Cluster Manager knows about each peer (spec
//! §3's `NodeInfo` entity). The peer map itself lives inside
//! `ClusterManager`'s single mutex (spec §3: "owned by the Cluster Manager;
//! all access is mediated by one cluster mutex"), not behind a lock of its
//! own: this module only provides the record type and the seed builder.

use std::collections::HashMap;
use std::time::Instant;

use crate::config::PeerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Primary,
    Secondary,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Primary => "primary",
            Role::Secondary => "secondary",
        }
    }
}

/// A known peer: its static identity plus the last observed liveness.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub node_id: String,
    pub host: String,
    pub port: u16,
    pub role: Role,
    pub last_heartbeat: Option<Instant>,
}

impl NodeInfo {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Build the initial peer map from the compiled-in membership list,
/// excluding `self_id` (a node does not track itself as a peer).
pub fn initial_peers(peers: &[PeerConfig], self_id: &str) -> HashMap<String, NodeInfo> {
    peers
        .iter()
        .filter(|p| p.node_id != self_id)
        .map(|p| {
            (
                p.node_id.to_string(),
                NodeInfo {
                    node_id: p.node_id.to_string(),
                    host: p.host.to_string(),
                    port: p.port,
                    role: Role::Secondary,
                    last_heartbeat: None,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CANONICAL_PEERS;

    #[test]
    fn initial_peers_excludes_self() {
        let peers = initial_peers(CANONICAL_PEERS, "node1");
        assert_eq!(peers.len(), 2);
        assert!(!peers.contains_key("node1"));
        assert!(peers.contains_key("node2"));
        assert!(peers.contains_key("node3"));
    }
}
