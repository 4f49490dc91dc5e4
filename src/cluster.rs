//! # Cluster Manager
//!
//! Owns role, term, vote record, and peer table (spec §3/§4.5) behind one
//! mutex, plus the two background threads that drive heartbeats and
//! elections. Grounded structurally on the teacher's "spawn a thread per
//! concern, gate it on a condition" pattern (`start_primary_server` /
//! `start_replica_server`); the term/vote/quorum vocabulary itself is common
//! Raft terminology, read for idiom from
//! `other_examples/7a83dcaf_jteplitz602-Rusty-Raft__src-server-mod.rs.rs`
//! and `other_examples/2f3c027b_simon-fu-async-raft__async-raft-src-raft.rs.rs`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::config::{self, PeerConfig};
use crate::error::ProtocolError;
use crate::peer_client;
use crate::topology::{self, NodeInfo, Role};
use crate::wire::PeerMessage;

struct Inner {
    role: Role,
    current_term: u64,
    voted_for: Option<String>,
    election_deadline: Instant,
    peers: HashMap<String, NodeInfo>,
}

fn random_election_timeout() -> Duration {
    let mut rng = rand::thread_rng();
    let secs = rng.gen_range(
        config::ELECTION_TIMEOUT_MIN.as_secs_f64()..config::ELECTION_TIMEOUT_MAX.as_secs_f64(),
    );
    Duration::from_secs_f64(secs)
}

/// The election/role state machine plus the peer table, the way spec §3
/// groups them under one owner and one lock.
pub struct ClusterManager {
    pub node_id: String,
    state: Mutex<Inner>,
    running: AtomicBool,
}

impl ClusterManager {
    /// `bootstrap_primary` is the `--primary` CLI hint: it only sets the
    /// initial role at term 0 (spec §9 "bootstrap identity") and defers to
    /// whatever term comparisons happen afterward.
    pub fn new(node_id: String, peers: &[PeerConfig], bootstrap_primary: bool) -> Arc<Self> {
        let role = if bootstrap_primary {
            Role::Primary
        } else {
            Role::Secondary
        };
        Arc::new(Self {
            state: Mutex::new(Inner {
                role,
                current_term: 0,
                voted_for: None,
                election_deadline: Instant::now() + random_election_timeout(),
                peers: topology::initial_peers(peers, &node_id),
            }),
            running: AtomicBool::new(true),
            node_id,
        })
    }

    pub fn role(&self) -> Role {
        self.state.lock().unwrap().role
    }

    pub fn is_primary(&self) -> bool {
        self.role() == Role::Primary
    }

    pub fn current_term(&self) -> u64 {
        self.state.lock().unwrap().current_term
    }

    /// A snapshot of known peers, safe to iterate without holding the lock
    /// across network I/O (spec §5: "dispatched from a snapshot of the peer
    /// set taken under the lock").
    pub fn peers_snapshot(&self) -> Vec<NodeInfo> {
        self.state.lock().unwrap().peers.values().cloned().collect()
    }

    /// `REGISTER_NODE`: insert or update a peer's record.
    pub fn register_node(&self, node_id: String, host: String, port: u16) {
        let mut inner = self.state.lock().unwrap();
        inner
            .peers
            .entry(node_id.clone())
            .and_modify(|n| {
                n.host = host.clone();
                n.port = port;
            })
            .or_insert(NodeInfo {
                node_id,
                host,
                port,
                role: Role::Secondary,
                last_heartbeat: None,
            });
    }

    /// `HEARTBEAT {from_node}` reception (spec §4.5 rule 2). Only a PRIMARY
    /// emits heartbeats, so receiving one also tells us `from_node`'s role;
    /// any other peer we'd previously believed PRIMARY is demoted in our
    /// local view.
    pub fn handle_heartbeat(&self, from_node: &str) {
        let mut inner = self.state.lock().unwrap();
        for (id, n) in inner.peers.iter_mut() {
            if id == from_node {
                n.last_heartbeat = Some(Instant::now());
                n.role = Role::Primary;
            } else if n.role == Role::Primary {
                n.role = Role::Secondary;
            }
        }
        inner.election_deadline = Instant::now() + random_election_timeout();
    }

    /// `ELECTION {candidate_id, term}` reception (spec §4.5 rule 4). Returns
    /// the term the vote was granted for, or the error the caller should
    /// report.
    pub fn handle_election(&self, candidate_id: &str, term: u64) -> Result<u64, ProtocolError> {
        let mut inner = self.state.lock().unwrap();

        if term < inner.current_term {
            return Err(ProtocolError::StaleTerm {
                current_term: inner.current_term,
            });
        }

        if term > inner.current_term {
            inner.current_term = term;
            inner.voted_for = None;
            if inner.role == Role::Primary {
                log::info!(
                    "node {} stepping down from primary: observed higher term {}",
                    self.node_id,
                    term
                );
                inner.role = Role::Secondary;
            }
        }

        let already_voted_for_other = matches!(&inner.voted_for, Some(v) if v != candidate_id);
        if already_voted_for_other {
            return Err(ProtocolError::AlreadyVoted);
        }

        inner.voted_for = Some(candidate_id.to_string());
        inner.election_deadline = Instant::now() + random_election_timeout();
        Ok(inner.current_term)
    }

    /// Starts the heartbeat-emitter and election-monitor background
    /// threads. Each loop re-checks role and the shutdown flag every tick,
    /// per spec §9's "explicit tasks that observe a shutdown signal and
    /// check role before doing work each tick".
    pub fn start_background_tasks(self: &Arc<Self>) {
        let heartbeat_mgr = self.clone();
        thread::spawn(move || heartbeat_mgr.heartbeat_loop());

        let election_mgr = self.clone();
        thread::spawn(move || election_mgr.election_monitor_loop());
    }

    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn heartbeat_loop(self: Arc<Self>) {
        while self.running.load(Ordering::SeqCst) {
            thread::sleep(config::HEARTBEAT_INTERVAL);
            if !self.is_primary() {
                continue;
            }
            let peers = self.peers_snapshot();
            for peer in peers {
                let msg = PeerMessage::Heartbeat {
                    from_node: self.node_id.clone(),
                };
                if let Err(e) = peer_client::send(&peer.addr(), &msg, config::PEER_RPC_TIMEOUT) {
                    log::warn!("heartbeat to {} failed: {e:#}", peer.node_id);
                }
            }
        }
    }

    fn election_monitor_loop(self: Arc<Self>) {
        const POLL_INTERVAL: Duration = Duration::from_millis(200);
        while self.running.load(Ordering::SeqCst) {
            thread::sleep(POLL_INTERVAL);
            let should_start = {
                let inner = self.state.lock().unwrap();
                inner.role == Role::Secondary && Instant::now() >= inner.election_deadline
            };
            if should_start {
                self.run_election();
            }
        }
    }

    /// Spec §4.5 rule 3: become a candidate, request votes, and either win
    /// the term or fall back to waiting for the next timeout.
    fn run_election(&self) {
        let (term, peers) = {
            let mut inner = self.state.lock().unwrap();
            if inner.role != Role::Secondary {
                return;
            }
            inner.current_term += 1;
            inner.voted_for = Some(self.node_id.clone());
            inner.election_deadline = Instant::now() + random_election_timeout();
            (inner.current_term, inner.peers.values().cloned().collect::<Vec<_>>())
        };

        log::info!(
            "node {} starting election for term {}",
            self.node_id,
            term
        );

        let total_nodes = peers.len() + 1;
        let quorum = config::quorum_size(total_nodes);
        let mut votes = 1usize;

        for peer in &peers {
            let msg = PeerMessage::Election {
                candidate_id: self.node_id.clone(),
                term,
            };
            match peer_client::send(&peer.addr(), &msg, config::PEER_RPC_TIMEOUT) {
                Ok(resp) => {
                    let granted = resp.get("status").and_then(|s| s.as_str()) == Some("OK")
                        && resp.get("term").and_then(|t| t.as_u64()) == Some(term);
                    if granted {
                        votes += 1;
                    }
                }
                Err(e) => {
                    log::warn!(
                        "election RPC to {} failed, counting as no vote: {e:#}",
                        peer.node_id
                    );
                }
            }
        }

        if votes < quorum {
            log::info!(
                "node {} lost election for term {} ({}/{} votes)",
                self.node_id,
                term,
                votes,
                quorum
            );
            return;
        }

        let mut inner = self.state.lock().unwrap();
        if inner.current_term == term && inner.role == Role::Secondary {
            inner.role = Role::Primary;
            log::info!("node {} became primary for term {}", self.node_id, term);
        }
    }
}
