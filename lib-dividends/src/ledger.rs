//! Balance Ledger
//!
//! Pure bookkeeping: per-account balances, total supply and allowances.
//! The ledger knows nothing about dividends beyond storing each account's
//! checkpoint; deciding *when* balances may change is the settlement
//! engine's job.
//!
//! Mutations come in `check_*` / `apply_*` pairs. A `check_*` call performs
//! every validation and overflow check for the change; the matching `apply_*`
//! call cannot fail once its check has passed and nothing else has touched
//! the ledger in between.

use std::collections::HashMap;

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use lib_types::{Address, Amount};

use crate::errors::{DividendError, DividendResult};

// =============================================================================
// ACCOUNT
// =============================================================================

/// A single holder record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Token balance in smallest units
    pub balance: Amount,
    /// Points-per-share value recorded at the last settlement
    pub dividend_checkpoint: U256,
    /// Cumulative dividends paid out to this account
    pub total_withdrawn: Amount,
    /// Entitlement crystallized at a settlement whose payout was not delivered
    pub deferred: Amount,
}

impl Account {
    /// Fresh account checkpointed at the given accumulator value
    pub fn new(dividend_checkpoint: U256) -> Self {
        Self {
            dividend_checkpoint,
            ..Self::default()
        }
    }
}

// =============================================================================
// BALANCE LEDGER
// =============================================================================

/// Balances, supply and allowances for one token
#[derive(Debug, Clone, Default)]
pub struct BalanceLedger {
    total_supply: Amount,
    accounts: HashMap<Address, Account>,
    allowances: HashMap<Address, HashMap<Address, Amount>>,
}

impl BalanceLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Balance of an account (0 for unknown identities)
    pub fn balance_of(&self, address: &Address) -> Amount {
        self.accounts.get(address).map(|a| a.balance).unwrap_or(0)
    }

    /// Account record, if the identity has ever been touched by a mutation
    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Existing account record, or the record a first touch would create
    pub fn account_or_new(&self, address: &Address, checkpoint: U256) -> Account {
        self.accounts
            .get(address)
            .cloned()
            .unwrap_or_else(|| Account::new(checkpoint))
    }

    /// Mutable account record, created on first touch at `checkpoint`
    pub fn account_entry(&mut self, address: Address, checkpoint: U256) -> &mut Account {
        self.accounts
            .entry(address)
            .or_insert_with(|| Account::new(checkpoint))
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &Account)> {
        self.accounts.iter()
    }

    pub fn holder_count(&self) -> usize {
        self.accounts.values().filter(|a| a.balance > 0).count()
    }

    /// Allowance granted by `owner` to `spender`
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    pub fn allowances(&self) -> impl Iterator<Item = (&Address, &Address, Amount)> {
        self.allowances.iter().flat_map(|(owner, spenders)| {
            spenders
                .iter()
                .map(move |(spender, amount)| (owner, spender, *amount))
        })
    }

    /// Set the allowance granted by `owner` to `spender`
    pub fn set_allowance(&mut self, owner: Address, spender: Address, amount: Amount) {
        self.allowances
            .entry(owner)
            .or_default()
            .insert(spender, amount);
    }

    // =========================================================================
    // Mint
    // =========================================================================

    pub fn check_mint(&self, to: &Address, amount: Amount) -> DividendResult<()> {
        if to.is_zero() {
            return Err(DividendError::InvalidRecipient);
        }
        self.total_supply
            .checked_add(amount)
            .ok_or(DividendError::Overflow)?;
        Ok(())
    }

    /// Credit newly issued tokens. `check_mint` must have passed.
    pub fn apply_mint(&mut self, to: Address, amount: Amount, checkpoint: U256) {
        self.total_supply += amount;
        self.account_entry(to, checkpoint).balance += amount;
    }

    // =========================================================================
    // Transfer
    // =========================================================================

    pub fn check_transfer(&self, from: &Address, to: &Address, amount: Amount) -> DividendResult<()> {
        if to.is_zero() {
            return Err(DividendError::InvalidRecipient);
        }

        let have = self.balance_of(from);
        if amount > have {
            return Err(DividendError::InsufficientBalance { have, need: amount });
        }
        Ok(())
    }

    /// Move tokens between accounts. `check_transfer` must have passed.
    ///
    /// The recipient's balance cannot overflow: it is bounded by total supply.
    pub fn apply_transfer(&mut self, from: Address, to: Address, amount: Amount, checkpoint: U256) {
        if from == to {
            return;
        }
        self.account_entry(from, checkpoint).balance -= amount;
        self.account_entry(to, checkpoint).balance += amount;
    }

    // =========================================================================
    // Allowance spending
    // =========================================================================

    /// Returns the allowance remaining after spending `amount`
    pub fn check_spend_allowance(
        &self,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> DividendResult<Amount> {
        let have = self.allowance(owner, spender);
        have.checked_sub(amount)
            .ok_or(DividendError::InsufficientAllowance { have, need: amount })
    }

    // =========================================================================
    // Audit
    // =========================================================================

    /// Verify `total_supply == sum(balances)`
    pub fn verify_supply(&self) -> DividendResult<()> {
        let mut sum: Amount = 0;
        for account in self.accounts.values() {
            sum = sum
                .checked_add(account.balance)
                .ok_or(DividendError::Overflow)?;
        }

        if sum != self.total_supply {
            return Err(DividendError::ConservationViolated(format!(
                "total_supply ({}) != sum of balances ({})",
                self.total_supply, sum
            )));
        }
        Ok(())
    }

    /// Rebuild a ledger from stored records
    pub(crate) fn from_parts(
        total_supply: Amount,
        accounts: HashMap<Address, Account>,
        allowances: HashMap<Address, HashMap<Address, Amount>>,
    ) -> Self {
        Self {
            total_supply,
            accounts,
            allowances,
        }
    }
}
