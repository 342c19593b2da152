//! Allowance ledger
//!
//! Invariant-preserving operations over the two-level
//! account -> (delegate -> amount) mapping, including the scoped
//! check-then-spend protocol used by delegated transfers and burns.

use crate::ledger::{assert_positive_amount, Account, AllowanceMap, Amount, LedgerError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How the allowance ledger treats missing and zero entries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowancePolicy {
    /// Report missing entries as 0 and drop entries that fall back to 0
    pub missing_means_zero: bool,
    /// Let an allowance of exactly 0 authorize a zero-amount spend
    pub zero_allowance_allows_transfer: bool,
}

impl Default for AllowancePolicy {
    fn default() -> Self {
        Self {
            missing_means_zero: true,
            zero_allowance_allows_transfer: false,
        }
    }
}

/// Mutable view over a host-owned allowance mapping
#[derive(Debug)]
pub struct Allowances<'a> {
    allowances: &'a mut AllowanceMap,
    policy: AllowancePolicy,
}

impl<'a> Allowances<'a> {
    /// Wrap a raw allowance mapping
    pub fn new(allowances: &'a mut AllowanceMap, policy: AllowancePolicy) -> Self {
        Self { allowances, policy }
    }

    /// All delegates of `account` with their allowance (empty if none)
    pub fn get_all(&self, account: &str) -> HashMap<Account, Amount> {
        self.allowances.get(account).cloned().unwrap_or_default()
    }

    /// Allowance of `delegate` on `account`.
    ///
    /// A missing entry reads as `Some(0)` under the default policy and as
    /// `None` otherwise.
    pub fn get_one(&self, account: &str, delegate: &str) -> Option<Amount> {
        let stored = self
            .allowances
            .get(account)
            .and_then(|delegates| delegates.get(delegate))
            .copied();

        match stored {
            Some(amount) => Some(amount),
            None if self.policy.missing_means_zero => Some(0),
            None => None,
        }
    }

    /// Check that `delegate` may spend `amount` on behalf of `account`
    pub fn require(&self, account: &str, delegate: &str, amount: Amount) -> Result<(), LedgerError> {
        assert_positive_amount(amount)?;

        let allowance = self.get_one(account, delegate);
        let authorized = match allowance {
            None => false,
            Some(0) if !self.policy.zero_allowance_allows_transfer => false,
            Some(have) => have >= amount,
        };

        if !authorized {
            return Err(LedgerError::InsufficientAllowance {
                account: account.to_string(),
                delegate: delegate.to_string(),
                have: allowance.unwrap_or(0),
                want: amount,
            });
        }
        Ok(())
    }

    /// Replace the allowance of `delegate` on `account`
    pub fn set(&mut self, account: &str, delegate: &str, amount: Amount) -> Result<(), LedgerError> {
        assert_positive_amount(amount)?;
        self.allowances
            .entry(account.to_string())
            .or_default()
            .insert(delegate.to_string(), amount);
        Ok(())
    }

    /// Raise the allowance of `delegate` on `account`. Returns the new allowance.
    pub fn increase(
        &mut self,
        account: &str,
        delegate: &str,
        amount: Amount,
    ) -> Result<Amount, LedgerError> {
        assert_positive_amount(amount)?;
        let new_allowance = self
            .get_one(account, delegate)
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow("increasing allowance"))?;
        self.set(account, delegate, new_allowance)?;
        Ok(new_allowance)
    }

    /// Lower the allowance of `delegate` on `account`, flooring at 0.
    ///
    /// Asking for more than the current allowance is not an error. Returns
    /// the remaining allowance.
    pub fn decrease(
        &mut self,
        account: &str,
        delegate: &str,
        amount: Amount,
    ) -> Result<Amount, LedgerError> {
        assert_positive_amount(amount)?;
        let current = self.get_one(account, delegate).unwrap_or(0);
        let remaining = if amount >= current {
            0
        } else {
            current - amount
        };
        self.set(account, delegate, remaining)?;
        self.post_decrease(account, delegate);
        Ok(remaining)
    }

    /// Signed convenience wrapper: positive deltas increase, negative ones decrease
    pub fn update(
        &mut self,
        account: &str,
        delegate: &str,
        delta: Amount,
    ) -> Result<Amount, LedgerError> {
        if delta >= 0 {
            self.increase(account, delegate, delta)
        } else {
            let amount = delta
                .checked_neg()
                .ok_or(LedgerError::Overflow("negating allowance delta"))?;
            self.decrease(account, delegate, amount)
        }
    }

    /// Run `action` as a delegated spend of `amount` by `delegate` on
    /// `account`'s behalf.
    ///
    /// The allowance is checked before `action` runs and debited only if it
    /// returns `Ok`. Any error from `action` is returned as-is and leaves the
    /// allowance untouched.
    pub fn transaction<T, E, F>(
        &mut self,
        account: &str,
        delegate: &str,
        amount: Amount,
        action: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<LedgerError>,
    {
        self.require(account, delegate, amount)?;
        let value = action()?;
        self.decrease(account, delegate, amount)?;
        Ok(value)
    }

    /// Drop the allowance of `delegate` on `account`
    pub fn clear_one(&mut self, account: &str, delegate: &str) {
        if let Some(delegates) = self.allowances.get_mut(account) {
            delegates.remove(delegate);
        }
    }

    /// Drop every allowance granted by `account`
    pub fn clear_all(&mut self, account: &str) {
        self.allowances.remove(account);
    }

    fn post_decrease(&mut self, account: &str, delegate: &str) {
        if !self.policy.missing_means_zero {
            return;
        }

        let emptied = match self.allowances.get_mut(account) {
            Some(delegates) => {
                if delegates.get(delegate) == Some(&0) {
                    delegates.remove(delegate);
                }
                delegates.is_empty()
            }
            None => false,
        };

        if emptied {
            self.clear_all(account);
        }
    }
}
