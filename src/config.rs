//! Static cluster configuration.
//!
//! The cluster membership is compiled in rather than loaded from a file: the
//! canonical deployment is a fixed 3-node cluster and every node ships with
//! the same list of peers (spec §6).

use std::time::Duration;

/// One entry in the static membership table.
#[derive(Debug, Clone, Copy)]
pub struct PeerConfig {
    pub node_id: &'static str,
    pub host: &'static str,
    pub port: u16,
}

/// The canonical 3-node cluster.
pub const CANONICAL_PEERS: &[PeerConfig] = &[
    PeerConfig {
        node_id: "node1",
        host: "127.0.0.1",
        port: 6379,
    },
    PeerConfig {
        node_id: "node2",
        host: "127.0.0.1",
        port: 6380,
    },
    PeerConfig {
        node_id: "node3",
        host: "127.0.0.1",
        port: 6381,
    },
];

pub const DEFAULT_HOST: &str = "127.0.0.1";

/// PRIMARY heartbeat emission interval.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);

/// Lower/upper bound for the randomized election timeout.
pub const ELECTION_TIMEOUT_MIN: Duration = Duration::from_secs(5);
pub const ELECTION_TIMEOUT_MAX: Duration = Duration::from_secs(8);

/// Per-call timeout for outbound peer RPCs (REPLICATE, ELECTION, HEARTBEAT).
pub const PEER_RPC_TIMEOUT: Duration = Duration::from_secs(2);

/// Strict-majority quorum size for a cluster of `n` nodes.
pub fn quorum_size(n: usize) -> usize {
    n / 2 + 1
}
