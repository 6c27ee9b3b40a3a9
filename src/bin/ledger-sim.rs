#![forbid(unsafe_code)]
//! Three-peer simulation: funding, a mining race, and fork resolution.

use clap::Parser;
use peerledger::config::{load_config, DEFAULT_CONFIG_PATH};
use peerledger::Node;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Override the proof-of-work difficulty
    #[arg(long)]
    difficulty: Option<u32>,
    /// Override the block reward
    #[arg(long)]
    reward: Option<i64>,
}

fn short(hash: &str, len: usize) -> &str {
    &hash[..hash.len().min(len)]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(difficulty) = cli.difficulty {
        config.ledger.difficulty = difficulty;
    }
    if let Some(reward) = cli.reward {
        config.ledger.block_reward = reward;
    }
    config.validate()?;

    let nodes: Vec<Node> = config
        .network
        .peers
        .iter()
        .map(|name| Node::new(name.clone(), &config))
        .collect();

    // Connect every node to every other node.
    for (i, node) in nodes.iter().enumerate() {
        for other in &nodes[i + 1..] {
            node.connect(other);
        }
    }

    let faucet = config.ledger.faucet_address.clone();
    let first = &nodes[0];
    for node in &nodes {
        first.new_tx(&faucet, node.name(), 200).await?;
    }

    println!("\n=== {} mines funding block ===", first.name());
    let funding = first.mine().await?;
    println!(
        "{} mined block #{} with hash {}...",
        first.name(),
        funding.index,
        short(funding.hash_str(), 16)
    );

    println!("Balances after funding:");
    for node in &nodes {
        let mut line = format!("  On {}'s view ->", node.name());
        for account in &nodes {
            line.push_str(&format!(" {}: {}", account.name(), node.balance(account.name()).await));
        }
        println!("{}", line);
    }

    if nodes.len() >= 3 {
        let (second, third) = (&nodes[1], &nodes[2]);
        second.new_tx(second.name(), third.name(), 30).await?;
        third.new_tx(third.name(), first.name(), 25).await?;

        println!("\n=== {} and {} race to mine (possible fork) ===", second.name(), third.name());
        let (b, c) = tokio::join!(second.mine(), third.mine());
        for (node, outcome) in [(second, b), (third, c)] {
            match outcome {
                Ok(block) => println!(
                    "{} mined block #{} -> {}...",
                    node.name(),
                    block.index,
                    short(block.hash_str(), 16)
                ),
                Err(err) => println!("{} stopped mining: {}", node.name(), err),
            }
        }
    }

    println!("\n=== Consensus: resolve conflicts (longest valid chain wins) ===");
    for node in &nodes {
        let changed = node.resolve_conflicts().await;
        println!(
            "{} {}; height={}",
            node.name(),
            if changed { "adopted a longer chain" } else { "kept its chain" },
            node.height().await
        );
    }

    println!("\n=== {} mines another block to extend the winning chain ===", first.name());
    let extension = first.mine().await?;
    println!(
        "{} mined block #{} -> {}...",
        first.name(),
        extension.index,
        short(extension.hash_str(), 16)
    );

    for node in &nodes {
        node.resolve_conflicts().await;
    }

    println!("\n=== Final Balances on each node's view ===");
    for node in &nodes {
        let mut line = format!("[{}]", node.name());
        for account in &nodes {
            let balance = node.balance(account.name()).await;
            line.push_str(&format!(" {}: {} |", account.name(), balance));
        }
        line.push_str(&format!(" Miner({}): {}", node.name(), node.balance(node.name()).await));
        println!("{}", line);
    }

    println!("\n=== Final chain (as seen by {}) ===", first.name());
    for block in first.chain().await {
        println!(
            "Block #{} | prev={} | hash={} | txs={} | nonce={}",
            block.index,
            short(&block.previous_hash, 8),
            short(block.hash_str(), 8),
            block.transactions.len(),
            block.nonce
        );
    }

    Ok(())
}
