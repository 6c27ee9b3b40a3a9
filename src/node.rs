//! Peer node: a ledger plus its peer edges
//!
//! A [`Node`] is a cheap clonable handle. Each node owns its ledger behind an
//! async lock and only ever holds its own lock; cross-node operations copy
//! blocks into peers (`receive_block`) or copy peer chains out (`chain`).
//! Peers are held weakly, so connected nodes do not keep each other alive.

use crate::blockchain::{Block, Blockchain};
use crate::config::Config;
use crate::error::ChainError;
use crate::miner::mine_block_cancellable;
use crate::sync::{select_longest_chain, PeerChain};
use crate::transaction::Transaction;
use parking_lot::{Mutex, RwLock as PeerLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Proof-of-work search currently running for this node
#[derive(Debug)]
struct MiningJob {
    index: u64,
    cancel: Arc<AtomicBool>,
}

struct NodeInner {
    name: String,
    blockchain: RwLock<Blockchain>,
    peers: PeerLock<Vec<Weak<NodeInner>>>,
    mining: Mutex<Option<MiningJob>>,
    mining_timeout: Option<Duration>,
}

/// Clears the node's mining slot however the search ends.
struct MiningSlot<'a>(&'a Mutex<Option<MiningJob>>);

impl Drop for MiningSlot<'_> {
    fn drop(&mut self) {
        self.0.lock().take();
    }
}

#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.inner.name)
            .field("peers", &self.peer_names())
            .finish()
    }
}

impl Node {
    /// Create a node whose ledger starts at the configured genesis.
    pub fn new(name: impl Into<String>, config: &Config) -> Self {
        let name = name.into();
        debug!(node = %name, difficulty = config.ledger.difficulty, "creating node");
        Node {
            inner: Arc::new(NodeInner {
                name,
                blockchain: RwLock::new(Blockchain::new(&config.ledger)),
                peers: PeerLock::new(Vec::new()),
                mining: Mutex::new(None),
                mining_timeout: config.miner.timeout(),
            }),
        }
    }

    /// Node name, also used as the miner's reward address
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Register `other` and `self` as each other's peers. Idempotent; a node
    /// never peers with itself.
    pub fn connect(&self, other: &Node) {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return;
        }
        let added = register_peer(&self.inner, &other.inner);
        register_peer(&other.inner, &self.inner);
        if added {
            info!(node = %self.inner.name, peer = %other.inner.name, "connected peers");
        }
    }

    /// Live peers in connection order.
    pub fn peers(&self) -> Vec<Node> {
        self.inner
            .peers
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .map(|inner| Node { inner })
            .collect()
    }

    pub fn peer_names(&self) -> Vec<String> {
        self.peers().iter().map(|peer| peer.name().to_string()).collect()
    }

    pub fn is_mining(&self) -> bool {
        self.inner.mining.lock().is_some()
    }

    /// Admit a transaction into this node's pending pool.
    pub async fn new_tx(
        &self,
        sender: &str,
        recipient: &str,
        amount: i64,
    ) -> Result<String, ChainError> {
        self.inner
            .blockchain
            .write()
            .await
            .add_transaction(sender, recipient, amount)
    }

    pub async fn balance(&self, address: &str) -> i64 {
        self.inner.blockchain.read().await.get_balance(address)
    }

    /// Snapshot of the node's chain.
    pub async fn chain(&self) -> Vec<Block> {
        self.inner.blockchain.read().await.blocks.clone()
    }

    pub async fn height(&self) -> u64 {
        self.inner.blockchain.read().await.height()
    }

    pub async fn last_block(&self) -> Block {
        self.inner.blockchain.read().await.last_block().clone()
    }

    pub async fn pending(&self) -> Vec<Transaction> {
        self.inner.blockchain.read().await.pending_transactions().to_vec()
    }

    /// Mine the pending pool, append the block and broadcast it to peers.
    ///
    /// The search runs on the blocking pool and is abandoned when a peer
    /// block at the same or a higher index is accepted, when the chain is
    /// replaced, or when the configured mining timeout elapses.
    pub async fn mine(&self) -> Result<Block, ChainError> {
        let cancel = Arc::new(AtomicBool::new(false));
        // Register the job under the ledger guard so an accepted peer block always sees it.
        let candidate = {
            let blockchain = self.inner.blockchain.read().await;
            let mut slot = self.inner.mining.lock();
            if slot.is_some() {
                return Err(ChainError::MiningAlreadyRunning);
            }
            let candidate = blockchain.next_candidate(&self.inner.name);
            *slot = Some(MiningJob {
                index: candidate.index,
                cancel: cancel.clone(),
            });
            candidate
        };
        let slot = MiningSlot(&self.inner.mining);

        debug!(node = %self.inner.name, index = candidate.index, "mining started");
        let flag = cancel.clone();
        let mut handle =
            tokio::task::spawn_blocking(move || mine_block_cancellable(candidate, &flag));

        let joined = match self.inner.mining_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    cancel.store(true, Ordering::Relaxed);
                    let _ = handle.await;
                    let limit_ms = limit.as_millis() as u64;
                    warn!(node = %self.inner.name, limit_ms, "mining timed out");
                    return Err(ChainError::MiningTimedOut);
                }
            },
            None => handle.await,
        };

        let block = match joined.map_err(|e| ChainError::TaskFailed(e.to_string()))? {
            Ok(block) => block,
            Err(err) => {
                warn!(node = %self.inner.name, error = %err, "mining abandoned");
                return Err(err);
            }
        };

        if let Err(err) = self.inner.blockchain.write().await.commit_mined(block.clone()) {
            warn!(
                node = %self.inner.name,
                index = block.index,
                error = %err,
                "discarding mined block"
            );
            return Err(err);
        }
        drop(slot);

        info!(
            node = %self.inner.name,
            index = block.index,
            hash = %block.hash_str(),
            nonce = block.nonce,
            "mined block"
        );
        self.broadcast_block(&block).await;
        Ok(block)
    }

    /// Offer `block` to every peer. Returns how many peers appended it.
    pub async fn broadcast_block(&self, block: &Block) -> usize {
        let mut accepted = 0;
        for peer in self.peers() {
            if peer.receive_block(block.clone()).await {
                accepted += 1;
            }
        }
        debug!(node = %self.inner.name, index = block.index, accepted, "broadcast block");
        accepted
    }

    /// Append a peer's block if it extends this node's tip; otherwise drop it.
    pub async fn receive_block(&self, block: Block) -> bool {
        let index = block.index;
        let accepted = self.inner.blockchain.write().await.append_block(block);
        if accepted {
            self.cancel_mining_through(index);
        }
        accepted
    }

    /// Adopt the longest valid peer chain that is strictly longer than ours.
    pub async fn resolve_conflicts(&self) -> bool {
        let mut snapshots = Vec::new();
        for peer in self.peers() {
            let blocks = peer.chain().await;
            snapshots.push(PeerChain::new(peer.name(), blocks));
        }

        let replaced = {
            let mut blockchain = self.inner.blockchain.write().await;
            match select_longest_chain(&blockchain, snapshots) {
                Some(best) => {
                    let replaced = blockchain.replace_chain(&best.blocks);
                    if replaced {
                        info!(
                            node = %self.inner.name,
                            peer = %best.peer,
                            height = blockchain.height(),
                            "adopted peer chain"
                        );
                    }
                    replaced
                }
                None => false,
            }
        };

        if replaced {
            self.cancel_mining_through(u64::MAX);
        }
        replaced
    }

    fn cancel_mining_through(&self, index: u64) {
        if let Some(job) = self.inner.mining.lock().as_ref() {
            if job.index <= index {
                job.cancel.store(true, Ordering::Relaxed);
                debug!(node = %self.inner.name, candidate = job.index, "cancelling stale mining");
            }
        }
    }
}

/// Add `peer` to `node`'s peer list unless present. Returns whether it was added.
fn register_peer(node: &Arc<NodeInner>, peer: &Arc<NodeInner>) -> bool {
    let mut peers = node.peers.write();
    peers.retain(|weak| weak.strong_count() > 0);
    if peers.iter().any(|weak| std::ptr::eq(weak.as_ptr(), Arc::as_ptr(peer))) {
        return false;
    }
    peers.push(Arc::downgrade(peer));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LedgerConfig, MinerConfig};

    fn test_config(difficulty: u32) -> Config {
        Config {
            ledger: LedgerConfig {
                difficulty,
                ..LedgerConfig::default()
            },
            ..Config::default()
        }
    }

    async fn wait_until_mining(node: &Node) {
        while !node.is_mining() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[test]
    fn test_connect_is_symmetric_and_idempotent() {
        let config = test_config(1);
        let a = Node::new("A", &config);
        let b = Node::new("B", &config);
        a.connect(&b);
        b.connect(&a);
        a.connect(&b);
        assert_eq!(a.peer_names(), vec!["B"]);
        assert_eq!(b.peer_names(), vec!["A"]);
    }

    #[test]
    fn test_self_connection_is_ignored() {
        let a = Node::new("A", &test_config(1));
        a.connect(&a.clone());
        assert!(a.peers().is_empty());
    }

    #[test]
    fn test_dropped_peer_disappears() {
        let config = test_config(1);
        let a = Node::new("A", &config);
        {
            let b = Node::new("B", &config);
            a.connect(&b);
            assert_eq!(a.peers().len(), 1);
        }
        assert!(a.peers().is_empty());
    }

    #[tokio::test]
    async fn test_peer_block_cancels_local_mining() {
        tokio::time::timeout(Duration::from_secs(10), async {
            let config = test_config(1);
            let slow = Node::new("slow", &config);
            let fast = Node::new("fast", &config);
            slow.connect(&fast);
            // Only the slow node's target is unreachable.
            slow.inner.blockchain.write().await.difficulty = 64;

            let miner = slow.clone();
            let job = tokio::spawn(async move { miner.mine().await });
            wait_until_mining(&slow).await;

            let block = fast.mine().await.unwrap();
            assert_eq!(block.index, 1);

            assert_eq!(job.await.unwrap(), Err(ChainError::MiningCancelled));
            assert!(!slow.is_mining());
            assert_eq!(slow.height().await, 1);
            assert_eq!(slow.balance("fast").await, 50);
        })
        .await
        .expect("test_peer_block_cancels_local_mining timed out");
    }

    #[tokio::test]
    async fn test_block_accepted_while_mining_starts_is_not_missed() {
        tokio::time::timeout(Duration::from_secs(10), async {
            let config = test_config(1);
            let slow = Node::new("slow", &config);
            let fast = Node::new("fast", &config);
            let block = fast.mine().await.unwrap();

            // Hold the ledger so `mine` queues behind it, then land the peer
            // block in the same critical section.
            let mut guard = slow.inner.blockchain.write().await;
            guard.difficulty = 64;
            let miner = slow.clone();
            let job = tokio::spawn(async move { miner.mine().await });
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert!(!slow.is_mining());
            assert!(guard.append_block(block));
            drop(guard);

            wait_until_mining(&slow).await;
            let index = slow.inner.mining.lock().as_ref().map(|running| running.index);
            assert_eq!(index, Some(2));

            // A second peer block at the candidate's index cancels the search.
            let next = fast.mine().await.unwrap();
            assert_eq!(next.index, 2);
            assert!(slow.receive_block(next).await);
            assert_eq!(job.await.unwrap(), Err(ChainError::MiningCancelled));
            assert!(!slow.is_mining());
        })
        .await
        .expect("test_block_accepted_while_mining_starts_is_not_missed timed out");
    }

    #[tokio::test]
    async fn test_mining_timeout_and_single_job() {
        tokio::time::timeout(Duration::from_secs(10), async {
            let config = Config {
                miner: MinerConfig { timeout_secs: Some(1) },
                ..test_config(1)
            };
            let node = Node::new("N", &config);
            node.inner.blockchain.write().await.difficulty = 64;

            let miner = node.clone();
            let job = tokio::spawn(async move { miner.mine().await });
            wait_until_mining(&node).await;

            assert_eq!(node.mine().await, Err(ChainError::MiningAlreadyRunning));
            assert_eq!(job.await.unwrap(), Err(ChainError::MiningTimedOut));
            assert!(!node.is_mining());
            assert_eq!(node.height().await, 0);
        })
        .await
        .expect("test_mining_timeout_and_single_job timed out");
    }

    #[tokio::test]
    async fn test_receive_block_clears_pending_pool() {
        tokio::time::timeout(Duration::from_secs(10), async {
            let config = test_config(1);
            let a = Node::new("A", &config);
            let b = Node::new("B", &config);
            b.new_tx("faucet", "carol", 10).await.unwrap();

            let block = a.mine().await.unwrap();
            assert!(b.receive_block(block.clone()).await);
            assert!(b.pending().await.is_empty());
            assert_eq!(b.last_block().await, block);

            // Same block again no longer extends the tip.
            assert!(!b.receive_block(block).await);
        })
        .await
        .expect("test_receive_block_clears_pending_pool timed out");
    }
}
