//! CLI commands for the token ledger
//!
//! Implements all command handlers for the CLI interface. The CLI is a host
//! for the ledger: it loads the token state, runs one operation as the given
//! sender and writes the state back.

use crate::events::{EventSink, MemorySink, StdoutSink};
use crate::ledger::Amount;
use crate::token::{CallContext, Ledger, LedgerConfig, Token};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub data_dir: PathBuf,
    pub state_file: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".token_data"),
            state_file: "token.json".to_string(),
        }
    }
}

impl CliConfig {
    /// Use `data_dir` with the default state file name
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Path of the token state file
    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join(&self.state_file)
    }
}

/// On-disk token state
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateFile {
    config: LedgerConfig,
    token: Token,
}

/// Application state
///
/// Events raised by an operation are held back and only reach `sink` once
/// the resulting state has been written.
pub struct AppState<S = StdoutSink> {
    pub token: Token,
    pub ledger: Ledger<MemorySink>,
    sink: S,
    config: CliConfig,
}

impl<S: EventSink> AppState<S> {
    /// Load the token state, publishing saved events to `sink`
    pub fn load(config: CliConfig, sink: S) -> CliResult<Self> {
        let path = config.state_path();
        if !path.exists() {
            return Err(format!(
                "No token found at {:?}. Create one with: tokenctl init",
                path
            )
            .into());
        }

        let reader = BufReader::new(fs::File::open(&path)?);
        let state: StateFile = serde_json::from_reader(reader)?;
        if !state.token.book().is_consistent() {
            match state.token.book().circulating() {
                Some(circulating) => log::warn!(
                    "Stored supply {} does not match circulating {}",
                    state.token.total_supply(),
                    circulating
                ),
                None => log::warn!(
                    "Stored balances of {:?} sum past the amount range",
                    path
                ),
            }
        }

        Ok(Self {
            token: state.token,
            ledger: Ledger::with_config(state.config, MemorySink::new()),
            sink,
            config,
        })
    }

    /// Save the current state, then publish the events it produced
    pub fn save(&mut self) -> CliResult<()> {
        write_state(
            &self.config,
            &StateFile {
                config: *self.ledger.config(),
                token: self.token.clone(),
            },
        )?;

        for record in self.ledger.emitter_mut().sink_mut().take() {
            self.sink.publish(&record);
        }
        Ok(())
    }

    /// Downstream event sink
    pub fn sink(&self) -> &S {
        &self.sink
    }
}

fn write_state(config: &CliConfig, state: &StateFile) -> CliResult<()> {
    fs::create_dir_all(&config.data_dir)?;

    // Write to temporary file first
    let temp_path = config.data_dir.join(format!("{}.tmp", config.state_file));
    let writer = BufWriter::new(fs::File::create(&temp_path)?);
    serde_json::to_writer_pretty(writer, state)?;

    // Atomic rename
    fs::rename(&temp_path, config.state_path())?;
    Ok(())
}

/// Create a new token owned by `sender`
pub fn cmd_init(
    config: &CliConfig,
    sender: &str,
    supply: Amount,
    name: &str,
    symbol: &str,
    decimals: u8,
    ledger_config: LedgerConfig,
) -> CliResult<()> {
    if config.state_path().exists() {
        println!("⚠️  Token already exists at {:?}", config.state_path());
        return Ok(());
    }

    let token = Token::init(&CallContext::new(sender), supply, name, symbol, decimals)?;
    write_state(
        config,
        &StateFile {
            config: ledger_config,
            token: token.clone(),
        },
    )?;

    println!("✅ Token initialized!");
    println!("   📍 Address: {}", token.address);
    println!("   🏷️  {} ({})", token.name(), token.symbol());
    println!("   🔢 Decimals: {}", token.decimals());
    println!("   💰 Supply: {} (held by {})", token.total_supply(), sender);

    Ok(())
}

/// Display token info
pub fn cmd_info<S: EventSink>(state: &AppState<S>) -> CliResult<()> {
    let token = &state.token;

    println!("🪙 Token Info");
    println!("   ├─ Address: {}", token.address);
    println!("   ├─ Name: {}", token.name());
    println!("   ├─ Symbol: {}", token.symbol());
    println!("   ├─ Standard: {}", token.metadata.standard);
    println!("   ├─ Decimals: {}", token.decimals());
    println!("   ├─ Initial supply: {}", token.initial_supply());
    println!("   ├─ Total supply: {}", token.total_supply());
    println!("   └─ Holders: {}", token.holder_count());

    for (holder, balance) in token.holders().into_iter().take(10) {
        println!("      {} = {}", holder, balance);
    }

    Ok(())
}

/// Show the balance of an account
pub fn cmd_balance<S: EventSink>(state: &AppState<S>, account: &str) -> CliResult<()> {
    println!("💰 Balance for {}: {}", account, state.token.balance_of(account));
    Ok(())
}

/// Show allowances granted by an account
pub fn cmd_allowance<S: EventSink>(
    state: &AppState<S>,
    owner: &str,
    delegate: Option<&str>,
) -> CliResult<()> {
    match delegate {
        Some(delegate) => {
            println!(
                "🤝 Allowance of {} on {}: {}",
                delegate,
                owner,
                state.token.allowance(owner, delegate)
            );
        }
        None => {
            let allowances = state.token.allowances_of(owner);
            if allowances.is_empty() {
                println!("🤝 {} has not approved any delegate", owner);
            } else {
                println!("🤝 Allowances granted by {}:", owner);
                let mut delegates: Vec<_> = allowances.into_iter().collect();
                delegates.sort();
                for (delegate, amount) in delegates {
                    println!("   └─ {} = {}", delegate, amount);
                }
            }
        }
    }
    Ok(())
}

/// Transfer tokens from the sender
pub fn cmd_transfer<S: EventSink>(
    state: &mut AppState<S>,
    sender: &str,
    to: &str,
    amount: Amount,
) -> CliResult<()> {
    let ctx = CallContext::new(sender);
    state.token.transfer(&mut state.ledger, &ctx, to, amount)?;
    state.save()?;

    println!("📤 Transferred {} from {} to {}", amount, sender, to);
    Ok(())
}

/// Mint tokens into the sender's account
pub fn cmd_mint<S: EventSink>(state: &mut AppState<S>, sender: &str, amount: Amount) -> CliResult<()> {
    let ctx = CallContext::new(sender);
    let supply = state.token.mint(&mut state.ledger, &ctx, amount)?;
    state.save()?;

    println!("🪙 Minted {} to {} (supply: {})", amount, sender, supply);
    Ok(())
}

/// Burn tokens from the sender's account
pub fn cmd_burn<S: EventSink>(state: &mut AppState<S>, sender: &str, amount: Amount) -> CliResult<()> {
    let ctx = CallContext::new(sender);
    let supply = state.token.burn(&mut state.ledger, &ctx, amount)?;
    state.save()?;

    println!("🔥 Burned {} from {} (supply: {})", amount, sender, supply);
    Ok(())
}

/// Set a delegate's allowance on the sender's account
pub fn cmd_approve<S: EventSink>(
    state: &mut AppState<S>,
    sender: &str,
    delegate: &str,
    amount: Amount,
) -> CliResult<()> {
    let ctx = CallContext::new(sender);
    state.token.approve(&state.ledger, &ctx, delegate, amount)?;
    state.save()?;

    println!("🤝 {} may now spend {} on behalf of {}", delegate, amount, sender);
    Ok(())
}

/// Adjust a delegate's allowance on the sender's account
pub fn cmd_update_approve<S: EventSink>(
    state: &mut AppState<S>,
    sender: &str,
    delegate: &str,
    delta: Amount,
) -> CliResult<()> {
    let ctx = CallContext::new(sender);
    let allowance = state.token.update_approve(&state.ledger, &ctx, delegate, delta)?;
    state.save()?;

    println!("🤝 Allowance of {} on {} is now {}", delegate, sender, allowance);
    Ok(())
}

/// Transfer on behalf of another account
pub fn cmd_transfer_from<S: EventSink>(
    state: &mut AppState<S>,
    sender: &str,
    from: &str,
    to: &str,
    amount: Amount,
) -> CliResult<()> {
    let ctx = CallContext::new(sender);
    state
        .token
        .transfer_from(&mut state.ledger, &ctx, from, to, amount)?;
    state.save()?;

    println!("📤 {} transferred {} from {} to {}", sender, amount, from, to);
    Ok(())
}

/// Burn on behalf of another account
pub fn cmd_burn_from<S: EventSink>(
    state: &mut AppState<S>,
    sender: &str,
    from: &str,
    amount: Amount,
) -> CliResult<()> {
    let ctx = CallContext::new(sender);
    let supply = state.token.burn_from(&mut state.ledger, &ctx, from, amount)?;
    state.save()?;

    println!("🔥 {} burned {} from {} (supply: {})", sender, amount, from, supply);
    Ok(())
}
