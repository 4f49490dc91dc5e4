//! # Replicated Key-Value Cluster
//!
//! A small, in-memory, replicated key-value store cluster with a
//! Redis-like line protocol. A fixed membership of nodes cooperates to
//! provide one logical store: one node is PRIMARY and serves all client
//! reads and writes, the others are SECONDARIES that passively replicate
//! state and elect a new PRIMARY through a term-based voting protocol when
//! the old one becomes unreachable.
//!
//! ## Modules
//!
//! - [`store`] - the in-memory key-value map and its replication log
//! - [`topology`] - peer record types and the static membership seed
//! - [`config`] - compiled-in cluster membership and timer constants
//! - [`wire`] - the line protocol: parsing and response envelopes
//! - [`error`] - protocol-level error kinds
//! - [`cluster`] - the role/term/vote state machine and its background tasks
//! - [`peer_client`] - short-lived outbound connections to peers
//! - [`replicator`] - fans writes from the primary out to secondaries
//! - [`handler`] - dispatches parsed requests against store and cluster
//! - [`session`] - the TCP listener and per-connection session loop

pub mod cluster;
pub mod config;
pub mod error;
pub mod handler;
pub mod peer_client;
pub mod replicator;
pub mod session;
pub mod store;
pub mod topology;
pub mod wire;
