//! Ledger orchestration
//!
//! The public token operations. Each one composes the balance ledger, the
//! allowance ledger and the event emitter into a single atomic action over
//! host-owned maps: every check runs before the first mutation, and the only
//! two-ledger operations (`transfer_from`, `burn_from`) go through the
//! allowance transaction so the allowance is debited only after the balance
//! side fully succeeds.

use crate::events::{Emitter, Event, EventKind, EventSink};
use crate::ledger::{
    assert_positive_amount, AllowanceMap, AllowancePolicy, Allowances, Amount, BalanceMap,
    BalancePolicy, Balances, LedgerError,
};
use serde::{Deserialize, Serialize};

/// Policies applied to both ledgers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub balances: BalancePolicy,
    pub allowances: AllowancePolicy,
}

/// Runs token operations and reports them to an event sink.
///
/// Holds no ledger state of its own: balances, allowances and the total
/// supply are passed in by the caller on every call.
#[derive(Debug)]
pub struct Ledger<S> {
    config: LedgerConfig,
    emitter: Emitter<S>,
}

impl<S: EventSink> Ledger<S> {
    /// Create a ledger with the default policies
    pub fn new(sink: S) -> Self {
        Self::with_config(LedgerConfig::default(), sink)
    }

    /// Create a ledger with explicit policies
    pub fn with_config(config: LedgerConfig, sink: S) -> Self {
        Self::with_emitter(config, Emitter::new(sink))
    }

    /// Create a ledger around an existing emitter
    pub fn with_emitter(config: LedgerConfig, emitter: Emitter<S>) -> Self {
        Self { config, emitter }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn emitter(&self) -> &Emitter<S> {
        &self.emitter
    }

    pub fn emitter_mut(&mut self) -> &mut Emitter<S> {
        &mut self.emitter
    }

    /// Event sink
    pub fn sink(&self) -> &S {
        self.emitter.sink()
    }

    /// Move `amount` from `sender` to `to`
    pub fn transfer(
        &mut self,
        balance_of: &mut BalanceMap,
        sender: &str,
        to: &str,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        assert_positive_amount(amount)?;
        self.emitter.ensure(EventKind::Transfer)?;

        let mut balances = Balances::new(balance_of, self.config.balances);
        balances.require(sender, amount)?;
        if sender != to {
            balances.require_capacity(to, amount)?;
        }

        balances.withdraw(sender, amount)?;
        balances.deposit(to, amount)?;
        log::debug!("Transferred {} from {} to {}", amount, sender, to);

        self.emitter.emit(Event::Transfer {
            sender: sender.to_string(),
            to: to.to_string(),
            amount,
        })?;
        Ok(())
    }

    /// Create `amount` new tokens in `sender`'s account. Returns the new supply.
    pub fn mint(
        &mut self,
        balance_of: &mut BalanceMap,
        total_supply: Amount,
        sender: &str,
        amount: Amount,
    ) -> Result<Amount, LedgerError> {
        assert_positive_amount(amount)?;
        self.emitter.ensure(EventKind::Mint)?;

        let new_supply = total_supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow("minting supply"))?;

        let mut balances = Balances::new(balance_of, self.config.balances);
        let new_balance = balances.deposit(sender, amount)?;
        log::debug!("Minted {} to {} (supply {} -> {})", amount, sender, total_supply, new_supply);

        self.emitter.emit(Event::Mint {
            sender: sender.to_string(),
            amount,
            new_balance,
            old_supply: total_supply,
        })?;
        Ok(new_supply)
    }

    /// Destroy `amount` tokens from `sender`'s account. Returns the new supply.
    pub fn burn(
        &mut self,
        balance_of: &mut BalanceMap,
        total_supply: Amount,
        sender: &str,
        amount: Amount,
    ) -> Result<Amount, LedgerError> {
        assert_positive_amount(amount)?;
        self.emitter.ensure(EventKind::Burn)?;

        let mut balances = Balances::new(balance_of, self.config.balances);
        balances.require(sender, amount)?;

        let new_supply = total_supply
            .checked_sub(amount)
            .filter(|supply| *supply >= 0)
            .ok_or(LedgerError::Overflow("burning supply"))?;

        let new_balance = balances.withdraw(sender, amount)?;
        log::debug!("Burned {} from {} (supply {} -> {})", amount, sender, total_supply, new_supply);

        self.emitter.emit(Event::Burn {
            sender: sender.to_string(),
            amount,
            new_balance,
            old_supply: total_supply,
        })?;
        Ok(new_supply)
    }

    /// Let `delegate` spend up to `amount` on `sender`'s behalf, replacing any
    /// previous allowance
    pub fn approve(
        &self,
        allowance: &mut AllowanceMap,
        sender: &str,
        delegate: &str,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        Allowances::new(allowance, self.config.allowances).set(sender, delegate, amount)?;
        log::debug!("{} approved {} for {}", sender, delegate, amount);
        Ok(())
    }

    /// Adjust the allowance of `delegate` on `sender` by a signed delta.
    /// Returns the new allowance.
    pub fn update_approve(
        &self,
        allowance: &mut AllowanceMap,
        sender: &str,
        delegate: &str,
        delta: Amount,
    ) -> Result<Amount, LedgerError> {
        let new_allowance =
            Allowances::new(allowance, self.config.allowances).update(sender, delegate, delta)?;
        log::debug!(
            "{} adjusted allowance of {} by {} (now {})",
            sender,
            delegate,
            delta,
            new_allowance
        );
        Ok(new_allowance)
    }

    /// Transfer `amount` from `from` to `to` on behalf of `from`, spending
    /// `delegate`'s allowance
    pub fn transfer_from(
        &mut self,
        balance_of: &mut BalanceMap,
        allowance: &mut AllowanceMap,
        delegate: &str,
        from: &str,
        to: &str,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let mut allowances = Allowances::new(allowance, self.config.allowances);
        let result = allowances.transaction(from, delegate, amount, || {
            self.transfer(balance_of, from, to, amount)
        });

        if let Err(e) = &result {
            log::warn!("Delegated transfer by {} from {} rejected: {}", delegate, from, e);
        }
        result
    }

    /// Burn `amount` from `from`'s account, spending `delegate`'s allowance.
    /// Returns the new supply.
    pub fn burn_from(
        &mut self,
        balance_of: &mut BalanceMap,
        allowance: &mut AllowanceMap,
        total_supply: Amount,
        delegate: &str,
        from: &str,
        amount: Amount,
    ) -> Result<Amount, LedgerError> {
        let mut allowances = Allowances::new(allowance, self.config.allowances);
        let result = allowances.transaction(from, delegate, amount, || {
            self.burn(balance_of, total_supply, from, amount)
        });

        if let Err(e) = &result {
            log::warn!("Delegated burn by {} from {} rejected: {}", delegate, from, e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventRegistry, FieldValue, MemorySink};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn ledger() -> Ledger<MemorySink> {
        Ledger::new(MemorySink::new())
    }

    fn balances(entries: &[(&str, Amount)]) -> BalanceMap {
        entries
            .iter()
            .map(|(account, amount)| (account.to_string(), *amount))
            .collect()
    }

    fn balance(map: &BalanceMap, account: &str) -> Amount {
        map.get(account).copied().unwrap_or(0)
    }

    fn allowance(map: &AllowanceMap, account: &str, delegate: &str) -> Amount {
        map.get(account)
            .and_then(|delegates| delegates.get(delegate))
            .copied()
            .unwrap_or(0)
    }

    #[test]
    fn test_transfer() {
        let mut ledger = ledger();
        let mut balance_of = balances(&[("A", 100)]);

        ledger.transfer(&mut balance_of, "A", "B", 30).unwrap();

        assert_eq!(balance_of, balances(&[("A", 70), ("B", 30)]));
        let record = ledger.sink().last().unwrap();
        assert_eq!(record.event, "transfer");
        assert_eq!(record.field("sender"), Some(&FieldValue::from("A")));
        assert_eq!(record.field("to"), Some(&FieldValue::from("B")));
        assert_eq!(record.amount("amount"), Some(30));
    }

    #[test]
    fn test_transfer_zero_amount() {
        let mut ledger = ledger();
        let mut balance_of = balances(&[("A", 100), ("B", 5)]);

        ledger.transfer(&mut balance_of, "A", "B", 0).unwrap();

        assert_eq!(balance_of, balances(&[("A", 100), ("B", 5)]));
        assert_eq!(ledger.sink().len(), 1);
        assert_eq!(ledger.sink().last().unwrap().amount("amount"), Some(0));
    }

    #[test]
    fn test_transfer_insufficient_funds() {
        let mut ledger = ledger();
        let mut balance_of = balances(&[("A", 10)]);

        let result = ledger.transfer(&mut balance_of, "A", "B", 11);

        assert_eq!(
            result,
            Err(LedgerError::InsufficientFunds {
                account: "A".to_string(),
                have: 10,
                want: 11,
            })
        );
        assert_eq!(balance_of, balances(&[("A", 10)]));
        assert!(ledger.sink().is_empty());
    }

    #[test]
    fn test_transfer_negative_amount() {
        let mut ledger = ledger();
        let mut balance_of = balances(&[("A", 10)]);

        let result = ledger.transfer(&mut balance_of, "A", "B", -5);
        assert!(matches!(result, Err(LedgerError::InvalidAmount { amount: -5 })));
        assert_eq!(balance_of, balances(&[("A", 10)]));
    }

    #[test]
    fn test_transfer_to_full_account_leaves_sender_untouched() {
        let mut ledger = ledger();
        let mut balance_of = balances(&[("A", 10), ("B", Amount::MAX)]);

        let result = ledger.transfer(&mut balance_of, "A", "B", 1);

        assert!(matches!(result, Err(LedgerError::Overflow(_))));
        assert_eq!(balance(&balance_of, "A"), 10);
        assert_eq!(balance(&balance_of, "B"), Amount::MAX);
    }

    #[test]
    fn test_self_transfer() {
        let mut ledger = ledger();
        let mut balance_of = balances(&[("A", 10)]);

        ledger.transfer(&mut balance_of, "A", "A", 10).unwrap();
        assert_eq!(balance_of, balances(&[("A", 10)]));
    }

    #[test]
    fn test_transfer_with_broken_schema_does_not_mutate() {
        let mut registry = EventRegistry::new();
        registry.register("transfer", ["from", "to", "value"]);
        let emitter = Emitter::with_registry(registry, MemorySink::new());
        let mut ledger = Ledger::with_emitter(LedgerConfig::default(), emitter);
        let mut balance_of = balances(&[("A", 10)]);

        let result = ledger.transfer(&mut balance_of, "A", "B", 5);

        assert!(result.unwrap_err().is_schema_mismatch());
        assert_eq!(balance_of, balances(&[("A", 10)]));
    }

    #[test]
    fn test_mint() {
        let mut ledger = ledger();
        let mut balance_of = balances(&[("A", 100)]);

        let supply = ledger.mint(&mut balance_of, 100, "A", 50).unwrap();

        assert_eq!(supply, 150);
        assert_eq!(balance(&balance_of, "A"), 150);
        let record = ledger.sink().last().unwrap();
        assert_eq!(record.event, "mint");
        assert_eq!(record.amount("amount"), Some(50));
        assert_eq!(record.amount("new_balance"), Some(150));
        assert_eq!(record.amount("old_supply"), Some(100));
    }

    #[test]
    fn test_mint_zero_still_emits() {
        let mut ledger = ledger();
        let mut balance_of = BalanceMap::new();

        let supply = ledger.mint(&mut balance_of, 7, "A", 0).unwrap();

        assert_eq!(supply, 7);
        assert_eq!(ledger.sink().len(), 1);
        assert_eq!(ledger.sink().last().unwrap().amount("amount"), Some(0));
    }

    #[test]
    fn test_mint_supply_overflow() {
        let mut ledger = ledger();
        let mut balance_of = BalanceMap::new();

        let result = ledger.mint(&mut balance_of, Amount::MAX, "A", 1);
        assert!(matches!(result, Err(LedgerError::Overflow(_))));
        assert!(balance_of.is_empty());
    }

    #[test]
    fn test_burn() {
        let mut ledger = ledger();
        let mut balance_of = balances(&[("A", 100)]);

        let supply = ledger.burn(&mut balance_of, 100, "A", 100).unwrap();

        assert_eq!(supply, 0);
        assert!(!balance_of.contains_key("A"));
        let record = ledger.sink().last().unwrap();
        assert_eq!(record.event, "burn");
        assert_eq!(record.amount("new_balance"), Some(0));
        assert_eq!(record.amount("old_supply"), Some(100));
    }

    #[test]
    fn test_burn_insufficient_funds() {
        let mut ledger = ledger();
        let mut balance_of = balances(&[("A", 10)]);

        let result = ledger.burn(&mut balance_of, 10, "A", 20);
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientFunds { have: 10, want: 20, .. })
        ));
        assert_eq!(balance(&balance_of, "A"), 10);
        assert!(ledger.sink().is_empty());
    }

    #[test]
    fn test_approve_replaces_and_update_accumulates() {
        let ledger = ledger();
        let mut allowance_map = AllowanceMap::new();

        ledger.approve(&mut allowance_map, "A", "D", 50).unwrap();
        ledger.approve(&mut allowance_map, "A", "D", 20).unwrap();
        assert_eq!(allowance(&allowance_map, "A", "D"), 20);

        let mut allowance_map = AllowanceMap::new();
        ledger.approve(&mut allowance_map, "A", "D", 50).unwrap();
        let updated = ledger
            .update_approve(&mut allowance_map, "A", "D", 20)
            .unwrap();
        assert_eq!(updated, 70);
        assert_eq!(allowance(&allowance_map, "A", "D"), 70);

        let updated = ledger
            .update_approve(&mut allowance_map, "A", "D", -100)
            .unwrap();
        assert_eq!(updated, 0);
        assert!(allowance_map.is_empty());
    }

    #[test]
    fn test_approve_negative_amount() {
        let ledger = ledger();
        let mut allowance_map = AllowanceMap::new();

        assert!(matches!(
            ledger.approve(&mut allowance_map, "A", "D", -1),
            Err(LedgerError::InvalidAmount { .. })
        ));
        assert!(allowance_map.is_empty());
    }

    #[test]
    fn test_transfer_from() {
        let mut ledger = ledger();
        let mut balance_of = balances(&[("A", 100)]);
        let mut allowance_map = AllowanceMap::new();
        ledger.approve(&mut allowance_map, "A", "D", 40).unwrap();

        ledger
            .transfer_from(&mut balance_of, &mut allowance_map, "D", "A", "B", 25)
            .unwrap();

        assert_eq!(balance_of, balances(&[("A", 75), ("B", 25)]));
        assert_eq!(allowance(&allowance_map, "A", "D"), 15);
        let record = ledger.sink().last().unwrap();
        assert_eq!(record.field("sender"), Some(&FieldValue::from("A")));
        assert_eq!(record.amount("amount"), Some(25));
    }

    #[test]
    fn test_transfer_from_exhausts_allowance() {
        let mut ledger = ledger();
        let mut balance_of = balances(&[("A", 100)]);
        let mut allowance_map = AllowanceMap::new();
        ledger.approve(&mut allowance_map, "A", "D", 40).unwrap();

        ledger
            .transfer_from(&mut balance_of, &mut allowance_map, "D", "A", "B", 40)
            .unwrap();

        assert!(allowance_map.is_empty());
    }

    #[test]
    fn test_transfer_from_insufficient_allowance() {
        let mut ledger = ledger();
        let mut balance_of = balances(&[("A", 100)]);
        let mut allowance_map = AllowanceMap::new();
        ledger.approve(&mut allowance_map, "A", "D", 40).unwrap();

        let result =
            ledger.transfer_from(&mut balance_of, &mut allowance_map, "D", "A", "B", 50);

        assert_eq!(
            result,
            Err(LedgerError::InsufficientAllowance {
                account: "A".to_string(),
                delegate: "D".to_string(),
                have: 40,
                want: 50,
            })
        );
        assert_eq!(allowance(&allowance_map, "A", "D"), 40);
        assert_eq!(balance_of, balances(&[("A", 100)]));
        assert!(ledger.sink().is_empty());
    }

    #[test]
    fn test_transfer_from_failed_credit_keeps_allowance() {
        let mut ledger = ledger();
        let mut balance_of = balances(&[("A", 100), ("B", Amount::MAX)]);
        let mut allowance_map = AllowanceMap::new();
        ledger.approve(&mut allowance_map, "A", "D", 40).unwrap();

        let result =
            ledger.transfer_from(&mut balance_of, &mut allowance_map, "D", "A", "B", 10);

        assert!(matches!(result, Err(LedgerError::Overflow(_))));
        assert_eq!(allowance(&allowance_map, "A", "D"), 40);
        assert_eq!(balance(&balance_of, "A"), 100);
        assert!(ledger.sink().is_empty());
    }

    #[test]
    fn test_transfer_from_insufficient_funds_keeps_allowance() {
        let mut ledger = ledger();
        let mut balance_of = balances(&[("A", 5)]);
        let mut allowance_map = AllowanceMap::new();
        ledger.approve(&mut allowance_map, "A", "D", 40).unwrap();

        let result =
            ledger.transfer_from(&mut balance_of, &mut allowance_map, "D", "A", "B", 10);

        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(allowance(&allowance_map, "A", "D"), 40);
    }

    #[test]
    fn test_zero_allowance_policy() {
        let mut balance_of = balances(&[("A", 10)]);
        let mut allowance_map = AllowanceMap::new();

        let mut strict = ledger();
        strict.approve(&mut allowance_map, "A", "D", 0).unwrap();
        assert!(strict
            .transfer_from(&mut balance_of, &mut allowance_map, "D", "A", "B", 0)
            .is_err());

        let config = LedgerConfig {
            allowances: AllowancePolicy {
                zero_allowance_allows_transfer: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut lenient = Ledger::with_config(config, MemorySink::new());
        lenient
            .transfer_from(&mut balance_of, &mut allowance_map, "D", "A", "B", 0)
            .unwrap();
        assert_eq!(lenient.sink().len(), 1);
        assert_eq!(balance(&balance_of, "A"), 10);
    }

    #[test]
    fn test_burn_from() {
        let mut ledger = ledger();
        let mut balance_of = balances(&[("A", 100)]);
        let mut allowance_map = AllowanceMap::new();
        ledger.approve(&mut allowance_map, "A", "D", 30).unwrap();

        let supply = ledger
            .burn_from(&mut balance_of, &mut allowance_map, 100, "D", "A", 20)
            .unwrap();

        assert_eq!(supply, 80);
        assert_eq!(balance(&balance_of, "A"), 80);
        assert_eq!(allowance(&allowance_map, "A", "D"), 10);
        assert_eq!(ledger.sink().last().unwrap().event, "burn");
    }

    #[test]
    fn test_burn_from_failure_keeps_allowance() {
        let mut ledger = ledger();
        let mut balance_of = balances(&[("A", 10)]);
        let mut allowance_map = AllowanceMap::new();
        ledger.approve(&mut allowance_map, "A", "D", 30).unwrap();

        let result = ledger.burn_from(&mut balance_of, &mut allowance_map, 10, "D", "A", 20);

        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(allowance(&allowance_map, "A", "D"), 30);
        assert_eq!(balance(&balance_of, "A"), 10);

        let result = ledger.burn_from(&mut balance_of, &mut allowance_map, 10, "E", "A", 1);
        assert!(matches!(result, Err(LedgerError::InsufficientAllowance { .. })));
    }

    #[test]
    fn test_random_operations_preserve_invariants() {
        let accounts = ["A", "B", "C", "D"];
        let mut rng = StdRng::seed_from_u64(7);
        let mut ledger = ledger();
        let mut balance_of = balances(&[("A", 1_000), ("B", 500)]);
        let mut allowance_map = AllowanceMap::new();
        let mut supply: Amount = 1_500;

        for _ in 0..2_000 {
            let a = accounts[rng.gen_range(0..accounts.len())];
            let b = accounts[rng.gen_range(0..accounts.len())];
            let c = accounts[rng.gen_range(0..accounts.len())];
            let amount: Amount = rng.gen_range(-10..300);

            let circulating_before: Amount = balance_of.values().sum();
            let op = rng.gen_range(0..6);
            match op {
                0 => {
                    let _ = ledger.transfer(&mut balance_of, a, b, amount);
                }
                1 => {
                    let _ = ledger.approve(&mut allowance_map, a, b, amount);
                }
                2 => {
                    let _ = ledger.update_approve(&mut allowance_map, a, b, amount - 150);
                }
                3 => {
                    let _ = ledger.transfer_from(&mut balance_of, &mut allowance_map, a, b, c, amount);
                }
                4 => {
                    if let Ok(new_supply) = ledger.mint(&mut balance_of, supply, a, amount) {
                        supply = new_supply;
                    }
                }
                _ => {
                    if let Ok(new_supply) =
                        ledger.burn_from(&mut balance_of, &mut allowance_map, supply, a, b, amount)
                    {
                        supply = new_supply;
                    }
                }
            }

            let circulating: Amount = balance_of.values().sum();
            assert_eq!(circulating, supply);
            if op < 4 {
                // transfers and approvals never create or destroy tokens
                assert_eq!(circulating, circulating_before);
            }
            assert!(balance_of.values().all(|amount| *amount >= 0));
            assert!(allowance_map
                .values()
                .flat_map(|delegates| delegates.values())
                .all(|amount| *amount >= 0));
        }
    }
}
