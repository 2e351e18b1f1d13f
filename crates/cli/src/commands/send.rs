//! Send transaction command.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use memochain_core::{Address, Transaction};
use std::path::PathBuf;

#[derive(Args)]
pub struct SendArgs {
    /// Directory to store blockchain data
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Sender address (hex format, 0x-prefixed)
    #[arg(long)]
    from: String,

    /// Recipient address (hex format, 0x-prefixed)
    #[arg(long)]
    to: String,

    /// Message to deliver to the recipient
    #[arg(long, default_value = "")]
    message: String,

    /// Amount to transfer
    #[arg(long, default_value_t = 0)]
    amount: i64,
}

pub fn run(args: SendArgs) -> Result<()> {
    let from =
        Address::from_hex(&args.from).with_context(|| format!("invalid address: {}", args.from))?;
    let to =
        Address::from_hex(&args.to).with_context(|| format!("invalid address: {}", args.to))?;

    let tx = Transaction::new(from, to, args.message.into_bytes(), args.amount)
        .context("invalid transaction")?;

    let chain = super::open_chain(args.data_dir)?;
    chain.send_transaction(tx.clone())?;

    println!("{}  Transaction admitted", "✓".green().bold());
    println!("    Hash:   {}", tx.hash.to_string().bright_yellow());
    println!("    Amount: {}", tx.amount.to_string().bright_cyan());
    println!("    Fee:    {}", tx.fee.to_string().bright_cyan());
    println!("    Waiting to be packaged into a block.");

    chain.close()?;
    Ok(())
}
