//! Balance ledger
//!
//! Invariant-preserving operations over the account -> amount mapping.

use crate::ledger::{assert_positive_amount, Amount, BalanceMap, LedgerError};
use serde::{Deserialize, Serialize};

/// How the balance ledger treats accounts without an entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancePolicy {
    /// Report missing accounts as 0 and drop entries that fall back to 0
    pub missing_means_zero: bool,
}

impl Default for BalancePolicy {
    fn default() -> Self {
        Self {
            missing_means_zero: true,
        }
    }
}

/// Mutable view over a host-owned balance mapping
#[derive(Debug)]
pub struct Balances<'a> {
    balance: &'a mut BalanceMap,
    policy: BalancePolicy,
}

impl<'a> Balances<'a> {
    /// Wrap a raw balance mapping
    pub fn new(balance: &'a mut BalanceMap, policy: BalancePolicy) -> Self {
        Self { balance, policy }
    }

    /// Stored balance of `account`.
    ///
    /// A missing entry reads as `Some(0)` under the default policy and as
    /// `None` otherwise.
    pub fn get(&self, account: &str) -> Option<Amount> {
        match self.balance.get(account) {
            Some(&amount) => Some(amount),
            None if self.policy.missing_means_zero => Some(0),
            None => None,
        }
    }

    /// Balance of `account`, with missing entries read as 0 regardless of policy
    pub fn balance_of(&self, account: &str) -> Amount {
        self.balance.get(account).copied().unwrap_or(0)
    }

    /// Check that `account` holds at least `amount`
    pub fn require(&self, account: &str, amount: Amount) -> Result<(), LedgerError> {
        let have = self.balance_of(account);
        if have < amount {
            return Err(LedgerError::InsufficientFunds {
                account: account.to_string(),
                have,
                want: amount,
            });
        }
        Ok(())
    }

    /// Check that crediting `amount` to `account` stays in range
    pub fn require_capacity(&self, account: &str, amount: Amount) -> Result<(), LedgerError> {
        assert_positive_amount(amount)?;
        self.balance_of(account)
            .checked_add(amount)
            .map(|_| ())
            .ok_or(LedgerError::Overflow("crediting balance"))
    }

    /// Increase the balance of `account` by `amount`, creating the entry if
    /// required. Returns the new balance.
    pub fn deposit(&mut self, account: &str, amount: Amount) -> Result<Amount, LedgerError> {
        assert_positive_amount(amount)?;
        let new_balance = self
            .balance_of(account)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow("crediting balance"))?;
        self.balance.insert(account.to_string(), new_balance);
        Ok(new_balance)
    }

    /// Decrease the balance of `account` by `amount`. Returns the new balance.
    ///
    /// Fails without touching the ledger if the balance is too low. An entry
    /// that falls to 0 is removed under the default policy.
    pub fn withdraw(&mut self, account: &str, amount: Amount) -> Result<Amount, LedgerError> {
        assert_positive_amount(amount)?;
        self.require(account, amount)?;

        let new_balance = self.balance_of(account) - amount;
        if new_balance == 0 && self.policy.missing_means_zero {
            self.clear(account);
        } else {
            self.balance.insert(account.to_string(), new_balance);
        }
        Ok(new_balance)
    }

    /// Drop the entry of `account`
    pub fn clear(&mut self, account: &str) {
        self.balance.remove(account);
    }

    /// Sum of all stored balances, `None` if it leaves the amount range
    pub fn total(&self) -> Option<Amount> {
        self.balance
            .values()
            .try_fold(0, |acc: Amount, balance| acc.checked_add(*balance))
    }
}
