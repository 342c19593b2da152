//! Token Ledger CLI Application
//!
//! A command-line interface for running token operations against a token
//! state file. Events are printed to stdout as JSON lines.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use token_ledger::cli::{self, AppState, CliConfig};
use token_ledger::events::StdoutSink;
use token_ledger::ledger::{AllowancePolicy, Amount, BalancePolicy};
use token_ledger::token::{LedgerConfig, MAX_TOKEN_DECIMALS};

#[derive(Parser)]
#[command(name = "tokenctl")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Fungible token ledger: balances, allowances and delegated spends", long_about = None)]
struct Cli {
    /// Data directory for token storage
    #[arg(short, long, default_value = ".token_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new token, crediting the whole supply to the sender
    Init {
        /// Creator of the token
        #[arg(short, long)]
        sender: String,

        /// Initial supply in whole tokens
        #[arg(long, allow_negative_numbers = true)]
        supply: Amount,

        /// Token name
        #[arg(short, long)]
        name: String,

        /// Token symbol
        #[arg(long)]
        symbol: String,

        /// Decimal places
        #[arg(long, default_value_t = MAX_TOKEN_DECIMALS)]
        decimals: u8,

        /// Keep zero-valued entries instead of treating missing entries as 0
        #[arg(long)]
        keep_zero_entries: bool,

        /// Let a zero allowance authorize zero-amount delegated spends
        #[arg(long)]
        zero_allowance_allows_transfer: bool,
    },

    /// Display token information
    Info,

    /// Show the balance of an account
    Balance {
        #[arg(short, long)]
        account: String,
    },

    /// Show allowances granted by an account
    Allowance {
        /// Account granting the allowance
        #[arg(short, long)]
        owner: String,

        /// Only show this delegate
        #[arg(short, long)]
        delegate: Option<String>,
    },

    /// Transfer tokens from the sender
    Transfer {
        #[arg(short, long)]
        sender: String,

        #[arg(short, long)]
        to: String,

        #[arg(short, long, allow_negative_numbers = true)]
        amount: Amount,
    },

    /// Mint tokens into the sender's account
    Mint {
        #[arg(short, long)]
        sender: String,

        #[arg(short, long, allow_negative_numbers = true)]
        amount: Amount,
    },

    /// Burn tokens from the sender's account
    Burn {
        #[arg(short, long)]
        sender: String,

        #[arg(short, long, allow_negative_numbers = true)]
        amount: Amount,
    },

    /// Set the allowance of a delegate (replaces any previous allowance)
    Approve {
        #[arg(short, long)]
        sender: String,

        #[arg(short, long)]
        delegate: String,

        #[arg(short, long, allow_negative_numbers = true)]
        amount: Amount,
    },

    /// Raise or lower the allowance of a delegate
    UpdateApprove {
        #[arg(short, long)]
        sender: String,

        #[arg(short, long)]
        delegate: String,

        /// Signed change; negative values lower the allowance
        #[arg(long, allow_negative_numbers = true)]
        delta: Amount,
    },

    /// Transfer on behalf of another account, spending the sender's allowance
    TransferFrom {
        #[arg(short, long)]
        sender: String,

        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        to: String,

        #[arg(short, long, allow_negative_numbers = true)]
        amount: Amount,
    },

    /// Burn on behalf of another account, spending the sender's allowance
    BurnFrom {
        #[arg(short, long)]
        sender: String,

        #[arg(short, long)]
        from: String,

        #[arg(short, long, allow_negative_numbers = true)]
        amount: Amount,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = CliConfig::with_data_dir(cli.data_dir);

    // Handle init command separately (doesn't need existing state)
    if let Commands::Init {
        sender,
        supply,
        name,
        symbol,
        decimals,
        keep_zero_entries,
        zero_allowance_allows_transfer,
    } = &cli.command
    {
        let ledger_config = LedgerConfig {
            balances: BalancePolicy {
                missing_means_zero: !keep_zero_entries,
            },
            allowances: AllowancePolicy {
                missing_means_zero: !keep_zero_entries,
                zero_allowance_allows_transfer: *zero_allowance_allows_transfer,
            },
        };
        return cli::cmd_init(&config, sender, *supply, name, symbol, *decimals, ledger_config);
    }

    let mut state = AppState::load(config, StdoutSink)?;

    match cli.command {
        Commands::Init { .. } => unreachable!(),

        Commands::Info => cli::cmd_info(&state)?,

        Commands::Balance { account } => cli::cmd_balance(&state, &account)?,

        Commands::Allowance { owner, delegate } => {
            cli::cmd_allowance(&state, &owner, delegate.as_deref())?
        }

        Commands::Transfer { sender, to, amount } => {
            cli::cmd_transfer(&mut state, &sender, &to, amount)?
        }

        Commands::Mint { sender, amount } => cli::cmd_mint(&mut state, &sender, amount)?,

        Commands::Burn { sender, amount } => cli::cmd_burn(&mut state, &sender, amount)?,

        Commands::Approve {
            sender,
            delegate,
            amount,
        } => cli::cmd_approve(&mut state, &sender, &delegate, amount)?,

        Commands::UpdateApprove {
            sender,
            delegate,
            delta,
        } => cli::cmd_update_approve(&mut state, &sender, &delegate, delta)?,

        Commands::TransferFrom {
            sender,
            from,
            to,
            amount,
        } => cli::cmd_transfer_from(&mut state, &sender, &from, &to, amount)?,

        Commands::BurnFrom {
            sender,
            from,
            amount,
        } => cli::cmd_burn_from(&mut state, &sender, &from, amount)?,
    }

    Ok(())
}
