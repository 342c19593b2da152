//! T01 fungible token contract
//!
//! Binds metadata and an [`AccountBook`] to the ledger operations, acting on
//! behalf of the caller named in a [`CallContext`].

use crate::crypto::sha256_hex;
use crate::events::EventSink;
use crate::ledger::{
    assert_positive_amount, Account, AllowanceMap, Amount, BalanceMap, Balances, LedgerError,
};
use crate::token::operations::Ledger;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Token interface version implemented by [`Token`]
pub const TOKEN_STANDARD: &str = "T01.1";

/// Maximum number of decimals used to express amounts of a token
pub const MAX_TOKEN_DECIMALS: u8 = 8;

/// Token-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid symbol: must be 1-10 characters")]
    InvalidSymbol,
    #[error("Invalid name: must be 1-50 characters")]
    InvalidName,
    #[error("Invalid decimals: must be 0-{}", MAX_TOKEN_DECIMALS)]
    InvalidDecimals,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Identity of the caller of the current invocation
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CallContext {
    pub sender: Account,
}

impl CallContext {
    pub fn new(sender: impl Into<Account>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

/// Everything the ledger operations mutate, owned by the invoking layer
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBook {
    /// Balances: account -> amount
    pub balances: BalanceMap,
    /// Allowances: account -> (delegate -> amount)
    pub allowances: AllowanceMap,
    /// Tokens currently in circulation
    pub total_supply: Amount,
}

impl AccountBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of every stored balance, `None` if it leaves the amount range
    pub fn circulating(&self) -> Option<Amount> {
        self.balances
            .values()
            .try_fold(0, |acc: Amount, balance| acc.checked_add(*balance))
    }

    /// Whether the stored supply matches the balances
    pub fn is_consistent(&self) -> bool {
        self.circulating() == Some(self.total_supply)
    }
}

/// Token metadata (immutable after creation)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TokenMetadata {
    /// Token name (e.g., "My Token")
    pub name: String,
    /// Token symbol (e.g., "MTK")
    pub symbol: String,
    /// Decimal places
    pub decimals: u8,
    /// Supply at creation, in the smallest unit
    pub initial_supply: Amount,
    /// Creator address
    pub creator: String,
    /// Interface version
    pub standard: String,
    /// Timestamp when created
    pub created_at: DateTime<Utc>,
}

impl TokenMetadata {
    /// Create new token metadata with validation
    pub fn new(
        name: String,
        symbol: String,
        decimals: u8,
        initial_supply: Amount,
        creator: String,
    ) -> Result<Self, TokenError> {
        if name.is_empty() || name.chars().count() > 50 {
            return Err(TokenError::InvalidName);
        }

        if symbol.is_empty() || symbol.chars().count() > 10 {
            return Err(TokenError::InvalidSymbol);
        }

        if decimals > MAX_TOKEN_DECIMALS {
            return Err(TokenError::InvalidDecimals);
        }

        assert_positive_amount(initial_supply)?;

        Ok(Self {
            name,
            symbol,
            decimals,
            initial_supply,
            creator,
            standard: TOKEN_STANDARD.to_string(),
            created_at: Utc::now(),
        })
    }
}

/// A fungible token: metadata plus its ledger state
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Token {
    /// Token address, derived from creator and symbol
    pub address: String,
    /// Token metadata
    pub metadata: TokenMetadata,
    book: AccountBook,
}

impl Token {
    /// Create a token and credit the whole initial supply to the caller.
    ///
    /// `supply` is expressed in whole tokens and scaled by `10^decimals`.
    pub fn init(
        ctx: &CallContext,
        supply: Amount,
        name: &str,
        symbol: &str,
        decimals: u8,
    ) -> Result<Self, TokenError> {
        if decimals > MAX_TOKEN_DECIMALS {
            return Err(TokenError::InvalidDecimals);
        }
        assert_positive_amount(supply)?;

        let initial_supply = supply
            .checked_mul(10i128.pow(u32::from(decimals)))
            .ok_or(LedgerError::Overflow("scaling initial supply"))?;

        let metadata = TokenMetadata::new(
            name.to_string(),
            symbol.to_string(),
            decimals,
            initial_supply,
            ctx.sender.clone(),
        )?;

        let mut book = AccountBook::new();
        Balances::new(&mut book.balances, Default::default())
            .deposit(&metadata.creator, metadata.initial_supply)?;
        book.total_supply = metadata.initial_supply;

        let address = derive_address(&metadata.creator, &metadata.symbol);
        log::info!(
            "Token initialized: {} ({}) at {}, supply {}",
            metadata.name,
            metadata.symbol,
            address,
            book.total_supply
        );

        Ok(Self {
            address,
            metadata,
            book,
        })
    }

    // =========================================================================
    // View Functions
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn symbol(&self) -> &str {
        &self.metadata.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.metadata.decimals
    }

    pub fn initial_supply(&self) -> Amount {
        self.metadata.initial_supply
    }

    /// Current supply, including minted and burnt amounts
    pub fn total_supply(&self) -> Amount {
        self.book.total_supply
    }

    /// Get balance of an address
    pub fn balance_of(&self, address: &str) -> Amount {
        self.book.balances.get(address).copied().unwrap_or(0)
    }

    /// Get allowance of `delegate` on `owner`
    pub fn allowance(&self, owner: &str, delegate: &str) -> Amount {
        self.book
            .allowances
            .get(owner)
            .and_then(|delegates| delegates.get(delegate))
            .copied()
            .unwrap_or(0)
    }

    /// Every delegate approved by `owner`
    pub fn allowances_of(&self, owner: &str) -> HashMap<Account, Amount> {
        self.book.allowances.get(owner).cloned().unwrap_or_default()
    }

    /// Get all holders with a non-zero balance, largest first
    pub fn holders(&self) -> Vec<(&String, &Amount)> {
        let mut holders: Vec<_> = self.book.balances.iter().filter(|(_, &b)| b > 0).collect();
        holders.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        holders
    }

    pub fn holder_count(&self) -> usize {
        self.book.balances.values().filter(|&&b| b > 0).count()
    }

    pub fn book(&self) -> &AccountBook {
        &self.book
    }

    // =========================================================================
    // Entry Points
    // =========================================================================

    /// Transfer from the caller to `to`
    pub fn transfer<S: EventSink>(
        &mut self,
        ledger: &mut Ledger<S>,
        ctx: &CallContext,
        to: &str,
        amount: Amount,
    ) -> Result<(), TokenError> {
        ledger.transfer(&mut self.book.balances, &ctx.sender, to, amount)?;
        Ok(())
    }

    /// Create tokens in the caller's account
    pub fn mint<S: EventSink>(
        &mut self,
        ledger: &mut Ledger<S>,
        ctx: &CallContext,
        amount: Amount,
    ) -> Result<Amount, TokenError> {
        self.book.total_supply =
            ledger.mint(&mut self.book.balances, self.book.total_supply, &ctx.sender, amount)?;
        Ok(self.book.total_supply)
    }

    /// Destroy tokens from the caller's account
    pub fn burn<S: EventSink>(
        &mut self,
        ledger: &mut Ledger<S>,
        ctx: &CallContext,
        amount: Amount,
    ) -> Result<Amount, TokenError> {
        self.book.total_supply =
            ledger.burn(&mut self.book.balances, self.book.total_supply, &ctx.sender, amount)?;
        Ok(self.book.total_supply)
    }

    /// Set the allowance of `delegate` on the caller's account
    pub fn approve<S: EventSink>(
        &mut self,
        ledger: &Ledger<S>,
        ctx: &CallContext,
        delegate: &str,
        amount: Amount,
    ) -> Result<(), TokenError> {
        ledger.approve(&mut self.book.allowances, &ctx.sender, delegate, amount)?;
        Ok(())
    }

    /// Adjust the allowance of `delegate` on the caller's account
    pub fn update_approve<S: EventSink>(
        &mut self,
        ledger: &Ledger<S>,
        ctx: &CallContext,
        delegate: &str,
        delta: Amount,
    ) -> Result<Amount, TokenError> {
        Ok(ledger.update_approve(&mut self.book.allowances, &ctx.sender, delegate, delta)?)
    }

    /// Transfer from `from` to `to`, spending the caller's allowance on `from`
    pub fn transfer_from<S: EventSink>(
        &mut self,
        ledger: &mut Ledger<S>,
        ctx: &CallContext,
        from: &str,
        to: &str,
        amount: Amount,
    ) -> Result<(), TokenError> {
        ledger.transfer_from(
            &mut self.book.balances,
            &mut self.book.allowances,
            &ctx.sender,
            from,
            to,
            amount,
        )?;
        Ok(())
    }

    /// Burn from `from`, spending the caller's allowance on `from`
    pub fn burn_from<S: EventSink>(
        &mut self,
        ledger: &mut Ledger<S>,
        ctx: &CallContext,
        from: &str,
        amount: Amount,
    ) -> Result<Amount, TokenError> {
        self.book.total_supply = ledger.burn_from(
            &mut self.book.balances,
            &mut self.book.allowances,
            self.book.total_supply,
            &ctx.sender,
            from,
            amount,
        )?;
        Ok(self.book.total_supply)
    }
}

/// Derive a token address from its creator and symbol
pub fn derive_address(creator: &str, symbol: &str) -> String {
    let input = format!("{}:{}", creator, symbol);
    let hash = sha256_hex(input.as_bytes());
    format!("0x{}", &hash[..40])
}
