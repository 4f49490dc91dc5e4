//! # Command Handler
//!
//! Interprets the wire protocol: dispatches client commands and peer
//! messages against the Store and Cluster Manager, and renders the
//! response envelope of spec §4.3/§6. Grounded on the
//! request-dispatch shape of
//! `other_examples/6719e71f_xyzBits-talent-plan__courses-rust-projects-project-4-src-server.rs.rs`
//! (`match req { ... }` over a shared engine), adapted to this spec's
//! persistent line session rather than a length-prefixed JSON stream.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::cluster::ClusterManager;
use crate::error::ProtocolError;
use crate::replicator;
use crate::store::{KVStore, Operation};
use crate::wire::{ClientCommand, PeerMessage, Response};

/// Outcome of handling one client command: the response to send, and
/// whether the session/process should shut down afterward.
pub struct ClientOutcome {
    pub response: Value,
    pub shutdown: bool,
}

fn not_primary_error() -> Value {
    Response::error(ProtocolError::NotPrimary.to_string())
}

pub fn handle_client(
    cmd: ClientCommand,
    node_id: &str,
    store: &Arc<KVStore>,
    cluster: &Arc<ClusterManager>,
) -> ClientOutcome {
    let response = match cmd {
        ClientCommand::Set { key, value } => {
            if !cluster.is_primary() {
                not_primary_error()
            } else {
                store.set(key.clone(), value.clone());
                replicator::replicate(
                    cluster.peers_snapshot(),
                    Operation::Set,
                    key.clone(),
                    Some(value),
                );
                Response::ok_with(json!({ "message": format!("Key '{key}' set") }))
            }
        }
        ClientCommand::Get { key } => {
            if !cluster.is_primary() {
                not_primary_error()
            } else {
                match store.get(&key) {
                    Some(value) => Response::ok_with(json!({ "value": value })),
                    None => Response::error(ProtocolError::KeyNotFound(key).to_string()),
                }
            }
        }
        ClientCommand::Delete { key } => {
            if !cluster.is_primary() {
                not_primary_error()
            } else if store.delete(&key) {
                replicator::replicate(cluster.peers_snapshot(), Operation::Delete, key, None);
                Response::ok()
            } else {
                Response::error(ProtocolError::KeyNotFound(key).to_string())
            }
        }
        ClientCommand::Ping => Response::ok_with(json!({ "message": "PONG" })),
        ClientCommand::Status => Response::ok_with(json!({
            "node_id": node_id,
            "role": cluster.role().as_str(),
            "election_term": cluster.current_term(),
        })),
        ClientCommand::Shutdown => {
            return ClientOutcome {
                response: Response::ok_with(json!({ "message": "Server shutting down" })),
                shutdown: true,
            };
        }
        ClientCommand::Flush | ClientCommand::Snapshot => {
            Response::ok_with(json!({ "message": "No persistence enabled" }))
        }
    };
    ClientOutcome {
        response,
        shutdown: false,
    }
}

pub fn handle_peer(
    msg: PeerMessage,
    store: &Arc<KVStore>,
    cluster: &Arc<ClusterManager>,
) -> Value {
    match msg {
        PeerMessage::RegisterNode {
            node_id,
            host,
            port,
        } => {
            cluster.register_node(node_id, host, port);
            Response::ok()
        }
        PeerMessage::Replicate {
            operation,
            key,
            value,
        } => {
            if cluster.is_primary() {
                Response::error("this node is primary and is not a replication target")
            } else {
                store.apply_replication(operation, key, value);
                Response::ok()
            }
        }
        PeerMessage::Heartbeat { from_node } => {
            cluster.handle_heartbeat(&from_node);
            Response::ok()
        }
        PeerMessage::Election { candidate_id, term } => match cluster.handle_election(&candidate_id, term) {
            Ok(granted_term) => Response::ok_with(json!({
                "message": "Vote granted",
                "term": granted_term,
            })),
            Err(ProtocolError::StaleTerm { current_term }) => Response::error_with(
                ProtocolError::StaleTerm { current_term }.to_string(),
                json!({ "term": current_term }),
            ),
            Err(e) => Response::error(e.to_string()),
        },
        PeerMessage::Sync {
            from_node: _,
            since_timestamp,
        } => {
            let entries = store.log_since(since_timestamp);
            Response::ok_with(json!({ "entries": entries }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CANONICAL_PEERS;
    use serde_json::json;

    fn node(bootstrap_primary: bool) -> (Arc<KVStore>, Arc<ClusterManager>) {
        (
            Arc::new(KVStore::new()),
            ClusterManager::new("node1".to_string(), CANONICAL_PEERS, bootstrap_primary),
        )
    }

    #[test]
    fn set_and_get_succeed_on_primary() {
        let (store, cluster) = node(true);
        let outcome = handle_client(
            ClientCommand::Set {
                key: "k".into(),
                value: json!("v"),
            },
            "node1",
            &store,
            &cluster,
        );
        assert_eq!(outcome.response["status"], "OK");

        let outcome = handle_client(
            ClientCommand::Get { key: "k".into() },
            "node1",
            &store,
            &cluster,
        );
        assert_eq!(outcome.response["value"], json!("v"));
    }

    #[test]
    fn writes_and_reads_are_rejected_on_secondary() {
        let (store, cluster) = node(false);
        let outcome = handle_client(
            ClientCommand::Set {
                key: "k".into(),
                value: json!("v"),
            },
            "node1",
            &store,
            &cluster,
        );
        assert_eq!(outcome.response["status"], "ERROR");

        let outcome = handle_client(
            ClientCommand::Get { key: "k".into() },
            "node1",
            &store,
            &cluster,
        );
        assert_eq!(outcome.response["status"], "ERROR");
    }

    #[test]
    fn get_of_missing_key_is_key_not_found() {
        let (store, cluster) = node(true);
        let outcome = handle_client(
            ClientCommand::Get {
                key: "missing".into(),
            },
            "node1",
            &store,
            &cluster,
        );
        assert_eq!(outcome.response["status"], "ERROR");
        assert!(outcome.response["message"]
            .as_str()
            .unwrap()
            .contains("not found"));
    }

    #[test]
    fn ping_and_status_work_on_any_role() {
        let (store, cluster) = node(false);
        let outcome = handle_client(ClientCommand::Ping, "node1", &store, &cluster);
        assert_eq!(outcome.response["message"], "PONG");

        let outcome = handle_client(ClientCommand::Status, "node1", &store, &cluster);
        assert_eq!(outcome.response["role"], "secondary");
        assert_eq!(outcome.response["election_term"], 0);
    }

    #[test]
    fn shutdown_is_flagged_in_the_outcome() {
        let (store, cluster) = node(true);
        let outcome = handle_client(ClientCommand::Shutdown, "node1", &store, &cluster);
        assert!(outcome.shutdown);
        assert_eq!(outcome.response["status"], "OK");
    }

    #[test]
    fn flush_and_snapshot_are_documented_no_ops() {
        let (store, cluster) = node(true);
        let outcome = handle_client(ClientCommand::Flush, "node1", &store, &cluster);
        assert_eq!(outcome.response["status"], "OK");
        let outcome = handle_client(ClientCommand::Snapshot, "node1", &store, &cluster);
        assert_eq!(outcome.response["status"], "OK");
    }

    #[test]
    fn replicate_applied_on_secondary_but_rejected_on_primary() {
        let (store, cluster) = node(false);
        let resp = handle_peer(
            PeerMessage::Replicate {
                operation: Operation::Set,
                key: "k".into(),
                value: Some(json!("v")),
            },
            &store,
            &cluster,
        );
        assert_eq!(resp["status"], "OK");
        assert_eq!(store.get("k"), Some(json!("v")));

        let (store, cluster) = node(true);
        let resp = handle_peer(
            PeerMessage::Replicate {
                operation: Operation::Set,
                key: "k".into(),
                value: Some(json!("v")),
            },
            &store,
            &cluster,
        );
        assert_eq!(resp["status"], "ERROR");
    }

    #[test]
    fn election_message_grants_vote_and_reports_term() {
        let (store, cluster) = node(false);
        let resp = handle_peer(
            PeerMessage::Election {
                candidate_id: "node2".into(),
                term: 1,
            },
            &store,
            &cluster,
        );
        assert_eq!(resp["status"], "OK");
        assert_eq!(resp["term"], 1);
    }

    #[test]
    fn sync_returns_entries_newer_than_since() {
        let (store, cluster) = node(true);
        store.set("a".into(), json!(1));
        let resp = handle_peer(
            PeerMessage::Sync {
                from_node: "node2".into(),
                since_timestamp: -1.0,
            },
            &store,
            &cluster,
        );
        assert_eq!(resp["entries"].as_array().unwrap().len(), 1);
    }
}
