//! CLI commands module.

use anyhow::{Context, Result};
use clap::Subcommand;
use memochain_chain::{Blockchain, ChainConfig};
use memochain_consensus::TARGET_BITS;
use std::path::PathBuf;

mod account;
mod explore;
mod init;
mod mine;
mod send;

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the chain and show the pre-funded accounts
    Init(init::InitArgs),
    /// Show an account's balance and message log
    Account(account::AccountArgs),
    /// Build and admit a transaction
    Send(send::SendArgs),
    /// Mine one or more blocks in the foreground
    Mine(mine::MineArgs),
    /// Look up a block by hash
    Block(explore::BlockArgs),
    /// Look up a transaction by hash
    Tx(explore::TxArgs),
    /// Show pending transactions
    Pool(explore::PoolArgs),
    /// Walk the chain from the tip back to genesis
    Chain(explore::ChainArgs),
}

pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init(args) => init::run(args),
        Commands::Account(args) => account::run(args),
        Commands::Send(args) => send::run(args),
        Commands::Mine(args) => mine::run(args),
        Commands::Block(args) => explore::run_block(args),
        Commands::Tx(args) => explore::run_tx(args),
        Commands::Pool(args) => explore::run_pool(args),
        Commands::Chain(args) => explore::run_chain(args),
    }
}

/// Open the chain under the given data directory at the default
/// difficulty. First use seeds the genesis block, which runs a real
/// proof-of-work search and can take a moment.
pub(crate) fn open_chain(data_dir: PathBuf) -> Result<Blockchain> {
    Blockchain::open(ChainConfig {
        data_dir,
        target_bits: TARGET_BITS,
    })
    .context("failed to open the chain data directory")
}
