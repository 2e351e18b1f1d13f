//! Initialize chain command.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use memochain_storage::AccountStore;
use std::path::PathBuf;

#[derive(Args)]
pub struct InitArgs {
    /// Directory to store blockchain data
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,
}

pub fn run(args: InitArgs) -> Result<()> {
    println!("{}", "Initializing memochain...".bold().cyan());
    println!();

    let chain = super::open_chain(args.data_dir)?;
    let tip = chain.tip()?;

    println!("{}  Chain ready", "✓".green().bold());
    println!("    Tip: {}", tip.to_string().bright_yellow());
    println!();

    println!("{}", "Pre-funded accounts:".bold());
    for addr in AccountStore::initial_addresses() {
        let balance = chain.balance_of(addr)?;
        println!(
            "  {}  balance {}",
            addr.to_hex().bright_yellow(),
            balance.to_string().bright_cyan()
        );
    }

    println!();
    println!(
        "Use {} to send a transaction and {} to mine.",
        "memochain send".bright_cyan(),
        "memochain mine".bright_cyan()
    );

    chain.close()?;
    Ok(())
}
