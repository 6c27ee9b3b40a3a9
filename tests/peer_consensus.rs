//! Integration tests for broadcast, forks and conflict resolution between nodes

use peerledger::config::{Config, LedgerConfig};
use peerledger::Node;
use std::time::Duration;

const TEST_TIMEOUT: Duration = Duration::from_secs(30);

fn test_config() -> Config {
    Config {
        ledger: LedgerConfig {
            difficulty: 1,
            ..LedgerConfig::default()
        },
        ..Config::default()
    }
}

fn fully_connected_trio() -> (Node, Node, Node) {
    let config = test_config();
    let p1 = Node::new("P1", &config);
    let p2 = Node::new("P2", &config);
    let p3 = Node::new("P3", &config);
    p1.connect(&p2);
    p2.connect(&p3);
    p3.connect(&p1);
    (p1, p2, p3)
}

#[tokio::test]
async fn test_broadcast_reaches_every_peer() {
    tokio::time::timeout(TEST_TIMEOUT, async {
        let (p1, p2, p3) = fully_connected_trio();
        for name in ["P1", "P2", "P3"] {
            p1.new_tx("faucet", name, 200).await.unwrap();
        }

        let block = p1.mine().await.unwrap();

        for node in [&p1, &p2, &p3] {
            assert_eq!(node.last_block().await, block);
            assert_eq!(node.balance("P2").await, 200);
            assert_eq!(node.balance("faucet").await, 9_400);
            assert_eq!(node.balance("P1").await, 250);
        }
    })
    .await
    .expect("test_broadcast_reaches_every_peer timed out");
}

#[tokio::test]
async fn test_conflicting_blocks_are_rejected_then_resolved() {
    tokio::time::timeout(TEST_TIMEOUT, async {
        let config = test_config();
        let p2 = Node::new("P2", &config);
        let p3 = Node::new("P3", &config);

        // Both mine index 1 from the shared genesis while disconnected.
        let b1 = p2.mine().await.unwrap();
        let c1 = p3.mine().await.unwrap();
        assert_eq!(b1.index, c1.index);
        assert_ne!(b1.hash, c1.hash);

        p2.connect(&p3);
        assert_eq!(p2.broadcast_block(&b1).await, 0);
        assert_eq!(p3.broadcast_block(&c1).await, 0);
        assert_eq!(p2.last_block().await, b1);
        assert_eq!(p3.last_block().await, c1);

        // Equal lengths: nobody switches.
        assert!(!p2.resolve_conflicts().await);
        assert!(!p3.resolve_conflicts().await);

        // P2 extends its branch; P3 drops the orphaned block.
        let b2 = p2.mine().await.unwrap();
        assert_eq!(b2.index, 2);
        assert_eq!(p3.height().await, 1);

        assert!(p3.resolve_conflicts().await);
        assert_eq!(p3.chain().await, p2.chain().await);
        assert_eq!(p3.balance("P3").await, 0);
        assert_eq!(p3.balance("P2").await, 100);
        assert!(!p2.resolve_conflicts().await);
    })
    .await
    .expect("test_conflicting_blocks_are_rejected_then_resolved timed out");
}

#[tokio::test]
async fn test_resolve_conflicts_picks_longest_peer() {
    tokio::time::timeout(TEST_TIMEOUT, async {
        let config = test_config();
        let hub = Node::new("hub", &config);
        let short = Node::new("short", &config);
        let long = Node::new("long", &config);

        short.mine().await.unwrap();
        for _ in 0..3 {
            long.mine().await.unwrap();
        }

        hub.connect(&short);
        hub.connect(&long);
        hub.new_tx("faucet", "someone", 1).await.unwrap();

        assert!(hub.resolve_conflicts().await);
        assert_eq!(hub.height().await, 3);
        assert_eq!(hub.chain().await, long.chain().await);
        assert!(hub.pending().await.is_empty());
        assert_eq!(hub.balance("long").await, 150);
    })
    .await
    .expect("test_resolve_conflicts_picks_longest_peer timed out");
}

#[tokio::test]
async fn test_lagging_peer_catches_up_via_resolution() {
    tokio::time::timeout(TEST_TIMEOUT, async {
        let config = test_config();
        let miner = Node::new("miner", &config);
        miner.mine().await.unwrap();
        miner.mine().await.unwrap();

        // A peer that joins late cannot accept the next block directly.
        let late = Node::new("late", &config);
        miner.connect(&late);
        let block = miner.mine().await.unwrap();
        assert_eq!(block.index, 3);
        assert_eq!(late.height().await, 0);

        assert!(late.resolve_conflicts().await);
        assert_eq!(late.height().await, 3);

        // Once in sync, broadcasts flow again.
        miner.mine().await.unwrap();
        assert_eq!(late.height().await, 4);
    })
    .await
    .expect("test_lagging_peer_catches_up_via_resolution timed out");
}

#[tokio::test]
async fn test_admission_errors_surface_through_node() {
    tokio::time::timeout(TEST_TIMEOUT, async {
        let node = Node::new("N", &test_config());
        assert!(node.new_tx("faucet", "A", 0).await.is_err());
        assert!(node.new_tx("coinbase", "A", 1).await.is_err());
        assert!(node.new_tx("A", "B", 1).await.is_err());
        assert!(node.pending().await.is_empty());

        let id = node.new_tx("faucet", "A", 5).await.unwrap();
        assert_eq!(id, peerledger::Transaction::new("faucet", "A", 5).id());
    })
    .await
    .expect("test_admission_errors_surface_through_node timed out");
}

#[tokio::test]
async fn test_concurrent_race_converges() {
    tokio::time::timeout(TEST_TIMEOUT, async {
        let (p1, p2, p3) = fully_connected_trio();
        p1.mine().await.unwrap();

        let (a, b) = tokio::join!(p2.mine(), p3.mine());
        // At least one of the racers commits a block; a loser is cancelled or stale.
        assert!(a.is_ok() || b.is_ok());

        for node in [&p1, &p2, &p3] {
            node.resolve_conflicts().await;
        }
        p1.mine().await.unwrap();
        for node in [&p1, &p2, &p3] {
            node.resolve_conflicts().await;
        }

        let reference = p1.chain().await;
        assert_eq!(p2.chain().await, reference);
        assert_eq!(p3.chain().await, reference);
    })
    .await
    .expect("test_concurrent_race_converges timed out");
}
