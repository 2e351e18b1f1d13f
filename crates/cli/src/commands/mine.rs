//! Mining command.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use memochain_consensus::CancelToken;
use memochain_core::Address;
use std::path::PathBuf;

#[derive(Args)]
pub struct MineArgs {
    /// Directory to store blockchain data
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Address credited with block awards (hex format, 0x-prefixed)
    #[arg(long)]
    miner: String,

    /// Number of blocks to mine
    #[arg(long, default_value_t = 1)]
    count: u32,
}

pub fn run(args: MineArgs) -> Result<()> {
    let miner = Address::from_hex(&args.miner)
        .with_context(|| format!("invalid address: {}", args.miner))?;

    let chain = super::open_chain(args.data_dir)?;
    let cancel = CancelToken::new();

    for _ in 0..args.count {
        println!("Mining block...");
        let block = chain.mine_block(miner, &cancel)?;
        println!("{}  New block mined", "✓".green().bold());
        println!("    Hash:  {}", block.hash.to_string().bright_yellow());
        println!("    Nonce: {}", block.nonce);
        println!("    Txs:   {}", block.txs.len());
    }

    chain.close()?;
    Ok(())
}
