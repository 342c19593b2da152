//! Ledger errors

use crate::events::EventError;
use crate::ledger::Amount;
use thiserror::Error;

/// Errors raised by ledger and orchestration operations
///
/// Every variant carries enough context (accounts, requested and available
/// amounts) for a caller to build a diagnostic without re-reading the ledgers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Negative amounts ({amount}) are forbidden")]
    InvalidAmount { amount: Amount },
    #[error("Account {account} has insufficient funds ({have} < {want})")]
    InsufficientFunds {
        account: String,
        have: Amount,
        want: Amount,
    },
    #[error("{delegate} has not enough approval to spend {want} on behalf of {account} (allowance: {have})")]
    InsufficientAllowance {
        account: String,
        delegate: String,
        have: Amount,
        want: Amount,
    },
    #[error("Arithmetic overflow while {0}")]
    Overflow(&'static str),
    #[error(transparent)]
    Event(#[from] EventError),
}

impl LedgerError {
    /// Whether this error came from a failed schema check on an event
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, LedgerError::Event(EventError::SchemaMismatch { .. }))
    }
}
