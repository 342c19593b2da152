//! Token Ledger: the accounting core of a fungible token
//!
//! This crate provides:
//! - Balance ledger (account -> amount) with missing-means-zero cleanup
//! - Allowance ledger (account -> delegate -> amount) with a scoped
//!   check-then-spend transaction
//! - Schema-checked event emission to pluggable sinks
//! - Atomic token operations: transfer, mint, burn, approve, update-approve,
//!   transfer-from and burn-from
//! - A T01 token contract and a small CLI host
//!
//! Ledger state is never global: the caller owns the balance and allowance
//! maps and the total supply, and passes them into every operation.
//!
//! # Example
//!
//! ```rust
//! use token_ledger::events::MemorySink;
//! use token_ledger::ledger::{AllowanceMap, BalanceMap};
//! use token_ledger::token::Ledger;
//!
//! let mut ledger = Ledger::new(MemorySink::new());
//! let mut balances = BalanceMap::new();
//! let mut allowances = AllowanceMap::new();
//!
//! // Mint, then delegate part of it
//! let supply = ledger.mint(&mut balances, 0, "alice", 100).unwrap();
//! ledger.approve(&mut allowances, "alice", "bob", 40).unwrap();
//!
//! // Bob spends from Alice's account
//! ledger
//!     .transfer_from(&mut balances, &mut allowances, "bob", "alice", "carol", 30)
//!     .unwrap();
//!
//! assert_eq!(supply, 100);
//! assert_eq!(balances["alice"], 70);
//! assert_eq!(balances["carol"], 30);
//! assert_eq!(allowances["alice"]["bob"], 10);
//! ```

pub mod cli;
pub mod crypto;
pub mod events;
pub mod ledger;
pub mod token;

// Re-export commonly used types
pub use events::{Emitter, Event, EventError, EventRecord, EventRegistry, EventSink, MemorySink};
pub use ledger::{
    AllowanceMap, AllowancePolicy, Allowances, Amount, BalanceMap, BalancePolicy, Balances,
    LedgerError,
};
pub use token::{AccountBook, CallContext, Ledger, LedgerConfig, Token, TokenError, TokenMetadata};
