//! Dividend Accumulator
//!
//! A single scaled running total ("points per share") is the source of truth
//! for proportional entitlement. A deposit bumps it in O(1); an account's
//! entitlement is the points gained since its checkpoint times its balance.
//!
//! # Invariants
//!
//! - `points_per_share` never decreases
//! - `total_withdrawn <= total_received`
//! - every account checkpoint is `<= points_per_share`

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use lib_types::Amount;

use crate::errors::{DividendError, DividendResult};
use crate::fixed_point;
use crate::ledger::Account;

/// Process-wide dividend totals for one ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DividendAccumulator {
    points_per_share: U256,
    total_received: Amount,
    total_withdrawn: Amount,
    deposit_count: u64,
    /// Largest supply any deposit was spread over (dust bound)
    max_supply_at_deposit: Amount,
}

impl DividendAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points_per_share(&self) -> U256 {
        self.points_per_share
    }

    /// Cumulative deposited value
    pub fn total_received(&self) -> Amount {
        self.total_received
    }

    /// Cumulative value paid out across all accounts
    pub fn total_withdrawn(&self) -> Amount {
        self.total_withdrawn
    }

    /// Deposited value not yet paid out (includes truncation dust)
    pub fn unclaimed(&self) -> Amount {
        self.total_received - self.total_withdrawn
    }

    pub fn deposit_count(&self) -> u64 {
        self.deposit_count
    }

    pub fn max_supply_at_deposit(&self) -> Amount {
        self.max_supply_at_deposit
    }

    /// Spread `amount` over `total_supply` shares.
    ///
    /// Returns the points-per-share increment. Nothing is written unless
    /// every check passes.
    pub fn deposit(&mut self, amount: Amount, total_supply: Amount) -> DividendResult<U256> {
        if amount == 0 {
            return Err(DividendError::InvalidDeposit);
        }
        if total_supply == 0 {
            return Err(DividendError::NoSupply);
        }

        let increment = fixed_point::points_for(amount, total_supply)?;
        let points_per_share = self
            .points_per_share
            .checked_add(increment)
            .ok_or(DividendError::Overflow)?;
        let total_received = self
            .total_received
            .checked_add(amount)
            .ok_or(DividendError::Overflow)?;

        self.points_per_share = points_per_share;
        self.total_received = total_received;
        self.deposit_count = self.deposit_count.saturating_add(1);
        self.max_supply_at_deposit = self.max_supply_at_deposit.max(total_supply);
        Ok(increment)
    }

    /// Entitlement of `account` at the current points value.
    ///
    /// Includes any deferred amount carried from an undelivered payout.
    pub fn pending_of(&self, account: &Account) -> DividendResult<Amount> {
        let delta = self
            .points_per_share
            .checked_sub(account.dividend_checkpoint)
            .ok_or_else(|| {
                DividendError::ConservationViolated(format!(
                    "checkpoint {} ahead of points_per_share {}",
                    account.dividend_checkpoint, self.points_per_share
                ))
            })?;

        fixed_point::accrued(delta, account.balance)?
            .checked_add(account.deferred)
            .ok_or(DividendError::Overflow)
    }

    /// Check that `amount` more can be recorded as withdrawn
    pub fn check_withdrawal(&self, amount: Amount) -> DividendResult<()> {
        let withdrawn = self
            .total_withdrawn
            .checked_add(amount)
            .ok_or(DividendError::Overflow)?;
        if withdrawn > self.total_received {
            return Err(DividendError::ConservationViolated(format!(
                "withdrawing {} would exceed received {}",
                withdrawn, self.total_received
            )));
        }
        Ok(())
    }

    /// Record a delivered payout. `check_withdrawal` must have passed.
    pub fn record_withdrawal(&mut self, amount: Amount) {
        self.total_withdrawn += amount;
    }
}
