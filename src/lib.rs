//! PeerLedger - a simulated proof-of-work ledger replicated across peers
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the ledger, derived balances and validation
//! - [`transaction`] - Transaction type and admission rules
//! - [`mempool`] - Bounded pending-transaction pool
//!
//! ## Consensus & Mining
//! - [`miner`] - Proof-of-work search (plain and cancellable)
//! - [`sync`] - Longest-valid-chain selection
//!
//! ## Cryptography
//! - [`crypto`] - Canonical SHA-256 hashing
//!
//! ## Peers
//! - [`node`] - Peer node with broadcast and conflict resolution
//! - [`codec`] - Wire encoding and chain export
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod mempool;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod miner;
pub mod sync;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Peers
// ============================================================================
pub mod codec;
pub mod node;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;

pub use blockchain::{Block, Blockchain};
pub use error::{ChainError, Result};
pub use node::Node;
pub use transaction::Transaction;
