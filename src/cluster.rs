//! Clustering Layer
//!
//! A minimal leader-by-lowest-id replication scheme layered on top of a
//! single `Engine`. There is no consensus protocol and no leader
//! election handshake: every node is configured with the same static
//! peer list, and the node with the lowest id in that list is always
//! the leader. Writes accepted on the leader are fanned out to
//! followers with `REPLICATE`/`REPLICATE_DEL` over `client::Client`;
//! follower failures are logged and otherwise ignored, matching this
//! crate's single-writer engine's "durable locally, best-effort
//! elsewhere" posture rather than promising any cross-node durability
//! guarantee.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::client::Client;
use crate::engine::Engine;
use crate::error::Result;

/// One other node in the cluster.
#[derive(Debug, Clone)]
pub struct Peer {
    pub id: u64,
    pub addr: String,
}

/// A clustered node: a local engine plus a static view of its peers.
pub struct Cluster {
    local_id: u64,
    engine: Arc<Engine>,
    peers: Vec<Peer>,
    /// Lazily-connected, reused replication clients, one per peer.
    followers: Mutex<Vec<Option<Client>>>,
}

impl Cluster {
    pub fn new(local_id: u64, engine: Arc<Engine>, peers: Vec<Peer>) -> Self {
        let followers = Mutex::new(peers.iter().map(|_| None).collect());
        Self { local_id, engine, peers, followers }
    }

    /// The id of whichever node — possibly this one — currently acts as
    /// leader.
    pub fn leader_id(&self) -> u64 {
        self.peers.iter().map(|p| p.id).chain(std::iter::once(self.local_id)).min().unwrap_or(self.local_id)
    }

    pub fn is_leader(&self) -> bool {
        self.leader_id() == self.local_id
    }

    /// Apply a write locally (this node must be the leader) and fan it
    /// out to every follower. Returns the same `bool` contract as
    /// `Engine::put`.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<bool> {
        if !self.is_leader() {
            return Err(crate::error::AtlasError::InvalidArgument(
                "writes must go to the cluster leader".into(),
            ));
        }

        let applied = self.engine.put(key, value)?;
        if applied {
            self.replicate(|client| client.replicate_put(key, value));
        }
        Ok(applied)
    }

    pub fn delete(&self, key: &[u8]) -> Result<bool> {
        if !self.is_leader() {
            return Err(crate::error::AtlasError::InvalidArgument(
                "writes must go to the cluster leader".into(),
            ));
        }

        let applied = self.engine.delete(key)?;
        if applied {
            self.replicate(|client| client.replicate_delete(key));
        }
        Ok(applied)
    }

    pub fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.engine.read(key)
    }

    fn replicate(&self, mut send: impl FnMut(&mut Client) -> Result<()>) {
        let mut followers = self.followers.lock();
        for (peer, slot) in self.peers.iter().zip(followers.iter_mut()) {
            if slot.is_none() {
                match Client::connect(&peer.addr) {
                    Ok(client) => *slot = Some(client),
                    Err(e) => {
                        tracing::warn!(peer = peer.id, addr = %peer.addr, error = %e, "failed to connect to follower");
                        continue;
                    }
                }
            }

            let client = slot.as_mut().unwrap();
            if let Err(e) = send(client) {
                tracing::warn!(peer = peer.id, addr = %peer.addr, error = %e, "replication to follower failed");
                *slot = None;
            }
        }
    }
}
