//! # Node Binary
//!
//! The process entry point: parses CLI flags, builds the store and cluster
//! state, starts the cluster's background tasks, then blocks on the TCP
//! listener. Grounded on the `clap::Parser` derive style used by
//! `chapter-05/rust/hello-sqlite/src/main.rs` and
//! `chapter-05/rust/http-bench/src/main.rs`, and the `env_logger` init used
//! by `chapter-04/rust/replicated-sqlite`.

use std::sync::Arc;

use clap::Parser;
use kv_cluster::cluster::ClusterManager;
use kv_cluster::config::{CANONICAL_PEERS, DEFAULT_HOST};
use kv_cluster::session;
use kv_cluster::store::KVStore;

/// One node of the replicated key-value cluster.
#[derive(Parser, Debug)]
#[command(name = "kv-node", about = "Replicated key-value cluster node")]
struct Args {
    /// Unique identifier for this node, e.g. "node1".
    #[arg(long = "node-id")]
    node_id: String,

    /// TCP port to listen on.
    #[arg(long)]
    port: u16,

    /// Start this node as PRIMARY at term 0. Absent means SECONDARY.
    /// A later-observed higher election term always takes precedence
    /// (spec: "bootstrap identity is a hint, not a guarantee").
    #[arg(long)]
    primary: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    if !CANONICAL_PEERS.iter().any(|p| p.node_id == args.node_id) {
        log::warn!(
            "node id '{}' is not part of the canonical cluster membership list",
            args.node_id
        );
    }

    let store = Arc::new(KVStore::new());
    let cluster = ClusterManager::new(args.node_id.clone(), CANONICAL_PEERS, args.primary);
    cluster.start_background_tasks();

    let addr = format!("{DEFAULT_HOST}:{}", args.port);
    log::info!(
        "starting node {} as {} (addr {addr})",
        args.node_id,
        if args.primary { "primary" } else { "secondary" }
    );

    session::run_listener(&addr, args.node_id, store, cluster)?;
    Ok(())
}
