//! Account lookup command.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use memochain_core::Address;
use std::path::PathBuf;

#[derive(Args)]
pub struct AccountArgs {
    /// Directory to store blockchain data
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Account address (hex format, 0x-prefixed)
    address: String,
}

pub fn run(args: AccountArgs) -> Result<()> {
    let address = Address::from_hex(&args.address)
        .with_context(|| format!("invalid address: {}", args.address))?;

    let chain = super::open_chain(args.data_dir)?;
    let account = chain.account_of(address)?;

    println!();
    println!("{} {}", "Account".bold().cyan(), address.to_hex().bright_yellow());
    println!("  Balance:  {}", account.balance.to_string().bright_cyan());
    println!("  Messages: {}", account.messages.len());
    for message in &account.messages {
        println!("    {}", String::from_utf8_lossy(message));
    }
    println!();

    chain.close()?;
    Ok(())
}
