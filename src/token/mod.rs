//! T01 fungible token
//!
//! Provides the ledger operations and a token contract built on them:
//! - [`Ledger`]: transfer, mint, burn, approve, update-approve,
//!   transfer-from and burn-from over host-owned maps
//! - [`Token`]: metadata plus an [`AccountBook`], acting for a [`CallContext`]
//!
//! # Example
//!
//! ```rust
//! use token_ledger::events::MemorySink;
//! use token_ledger::token::{CallContext, Ledger, Token};
//!
//! let creator = CallContext::new("creator");
//! let mut token = Token::init(&creator, 1_000, "My Token", "MTK", 2).unwrap();
//! let mut ledger = Ledger::new(MemorySink::new());
//!
//! // Transfer tokens
//! token.transfer(&mut ledger, &creator, "recipient", 1_000).unwrap();
//!
//! // Let a delegate spend on the creator's behalf
//! token.approve(&ledger, &creator, "spender", 500).unwrap();
//! let spender = CallContext::new("spender");
//! token.transfer_from(&mut ledger, &spender, "creator", "recipient", 200).unwrap();
//!
//! assert_eq!(token.balance_of("recipient"), 1_200);
//! assert_eq!(token.allowance("creator", "spender"), 300);
//! assert_eq!(ledger.sink().len(), 2);
//! ```

pub mod operations;
pub mod token;

pub use operations::{Ledger, LedgerConfig};
pub use token::{
    derive_address, AccountBook, CallContext, Token, TokenError, TokenMetadata,
    MAX_TOKEN_DECIMALS, TOKEN_STANDARD,
};
