//! Chain exploration commands: blocks, transactions, the pool, the
//! full chain walk.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use memochain_core::{Block, Hash, Transaction};
use std::path::PathBuf;

#[derive(Args)]
pub struct BlockArgs {
    /// Directory to store blockchain data
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Block hash (hex format, 0x-prefixed)
    hash: String,
}

#[derive(Args)]
pub struct TxArgs {
    /// Directory to store blockchain data
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Transaction hash (hex format, 0x-prefixed)
    hash: String,
}

#[derive(Args)]
pub struct PoolArgs {
    /// Directory to store blockchain data
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,
}

#[derive(Args)]
pub struct ChainArgs {
    /// Directory to store blockchain data
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,
}

pub fn run_block(args: BlockArgs) -> Result<()> {
    let hash =
        Hash::from_hex(&args.hash).with_context(|| format!("invalid hash: {}", args.hash))?;
    let chain = super::open_chain(args.data_dir)?;

    let block = chain.block(hash)?;
    print_block(&block);

    chain.close()?;
    Ok(())
}

pub fn run_tx(args: TxArgs) -> Result<()> {
    let hash =
        Hash::from_hex(&args.hash).with_context(|| format!("invalid hash: {}", args.hash))?;
    let chain = super::open_chain(args.data_dir)?;

    let tx = chain.transaction(hash)?;
    print_tx(&tx, "  ");

    chain.close()?;
    Ok(())
}

pub fn run_pool(args: PoolArgs) -> Result<()> {
    let chain = super::open_chain(args.data_dir)?;

    let txs = chain.pool_txs();
    println!(
        "{} {} pending transaction(s)",
        "Pool:".bold().cyan(),
        txs.len()
    );
    for tx in &txs {
        print_tx(tx, "  ");
    }

    chain.close()?;
    Ok(())
}

pub fn run_chain(args: ChainArgs) -> Result<()> {
    let chain = super::open_chain(args.data_dir)?;

    for block in chain.blocks_iter() {
        let block = block?;
        print_block(&block);
        println!();
    }
    println!("{}", "Genesis reached.".bold());

    chain.close()?;
    Ok(())
}

fn print_block(block: &Block) {
    println!(
        "{} {}",
        "Block".bold().cyan(),
        block.hash.to_string().bright_yellow()
    );
    println!("  Timestamp: {}", block.timestamp);
    println!("  Previous:  {}", block.prev_hash);
    println!("  Nonce:     {}", block.nonce);
    println!("  Miner:     {}", block.miner);
    println!("  Txs:       {}", block.txs.len());
    for tx in &block.txs {
        println!("    {}", tx.hash);
    }
}

fn print_tx(tx: &Transaction, indent: &str) {
    println!(
        "{}{} {}",
        indent,
        "Tx".bold().cyan(),
        tx.hash.to_string().bright_yellow()
    );
    println!("{}  From:    {}", indent, tx.from);
    println!("{}  To:      {}", indent, tx.to);
    println!("{}  Amount:  {}", indent, tx.amount);
    println!("{}  Fee:     {}", indent, tx.fee);
    if !tx.data.is_empty() {
        println!("{}  Message: {}", indent, String::from_utf8_lossy(&tx.data));
    }
}
