//! Balance and allowance ledgers
//!
//! Both ledgers are thin, policy-aware wrappers around host-owned maps:
//! - [`Balances`]: account -> amount
//! - [`Allowances`]: account -> (delegate -> amount)
//!
//! The wrappers never own the data. A host keeps the raw maps (usually inside
//! an [`AccountBook`](crate::token::AccountBook)), borrows them mutably for the
//! duration of one operation and persists them afterwards.
//!
//! # Example
//!
//! ```rust
//! use token_ledger::ledger::{BalanceMap, BalancePolicy, Balances};
//!
//! let mut raw = BalanceMap::new();
//! let mut balances = Balances::new(&mut raw, BalancePolicy::default());
//!
//! balances.deposit("alice", 100).unwrap();
//! balances.withdraw("alice", 100).unwrap();
//!
//! // Zero balances are dropped from the map but still read as 0
//! assert_eq!(balances.get("alice"), Some(0));
//! assert!(raw.is_empty());
//! ```

pub mod allowances;
pub mod balances;
pub mod error;

use std::collections::HashMap;

pub use allowances::{AllowancePolicy, Allowances};
pub use balances::{BalancePolicy, Balances};
pub use error::LedgerError;

/// Opaque account identifier
pub type Account = String;

/// Amount in the token's smallest unit.
///
/// Signed so negative inputs can be rejected at the boundary; stored amounts
/// are never negative.
pub type Amount = i128;

/// Raw balance mapping owned by the host
pub type BalanceMap = HashMap<Account, Amount>;

/// Raw allowance mapping owned by the host: account -> (delegate -> amount)
pub type AllowanceMap = HashMap<Account, HashMap<Account, Amount>>;

/// Reject negative amounts
pub fn assert_positive_amount(amount: Amount) -> Result<(), LedgerError> {
    if amount < 0 {
        return Err(LedgerError::InvalidAmount { amount });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_positive_amount() {
        assert!(assert_positive_amount(0).is_ok());
        assert!(assert_positive_amount(1).is_ok());
        assert!(matches!(
            assert_positive_amount(-1),
            Err(LedgerError::InvalidAmount { amount: -1 })
        ));
    }
}
