//! Settlement Engine
//!
//! [`DividendLedger`] is the public face of the crate. It owns the balance
//! ledger, the dividend accumulator and the payout gateway, and enforces one
//! rule: **no balance mutation changes an account's share count before the
//! entitlement accrued at the old share count has been settled.**
//!
//! # Operation shape
//!
//! Every mutating operation runs in three phases:
//!
//! 1. **Plan** - all validation and checked arithmetic, no writes
//! 2. **Deliver** - hand payouts to the gateway under the [`PayoutPolicy`]
//! 3. **Commit** - write settlements, balances and events (infallible)
//!
//! An error in phase 1 or 2 leaves the ledger exactly as it was.

use primitive_types::U256;
use tracing::{debug, info, warn};

use lib_types::{Address, Amount};

use crate::accumulator::DividendAccumulator;
use crate::config::{LedgerConfig, TokenMetadata};
use crate::errors::{DividendError, DividendResult};
use crate::events::LedgerEvent;
use crate::fixed_point;
use crate::gateway::{Payout, PayoutGateway, PayoutPolicy};
use crate::ledger::{Account, BalanceLedger};

// =============================================================================
// OUTCOMES
// =============================================================================

/// How a single account settlement ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementStatus {
    /// Nothing was pending; only the checkpoint moved
    Nothing,
    /// Pending amount delivered through the gateway
    Paid,
    /// Delivery failed under the defer policy; amount kept as credit
    Deferred,
}

/// Settlement of one account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub account: Address,
    pub amount: Amount,
    pub status: SettlementStatus,
}

/// Settlements performed as a side effect of a balance-changing operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettlementOutcome {
    pub settlements: Vec<Settlement>,
}

impl SettlementOutcome {
    /// Amount delivered to `account` by this operation
    pub fn paid_to(&self, account: &Address) -> Amount {
        self.settlements
            .iter()
            .filter(|s| s.account == *account && s.status == SettlementStatus::Paid)
            .map(|s| s.amount)
            .sum()
    }

    /// Amount kept as credit for `account` by this operation
    pub fn deferred_to(&self, account: &Address) -> Amount {
        self.settlements
            .iter()
            .filter(|s| s.account == *account && s.status == SettlementStatus::Deferred)
            .map(|s| s.amount)
            .sum()
    }

    pub fn total_paid(&self) -> Amount {
        self.settlements
            .iter()
            .filter(|s| s.status == SettlementStatus::Paid)
            .map(|s| s.amount)
            .sum()
    }
}

/// Result of a successful deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositOutcome {
    pub amount: Amount,
    /// Points-per-share added by this deposit
    pub points_increment: U256,
    /// Points-per-share after the deposit
    pub points_per_share: U256,
}

// =============================================================================
// DIVIDEND LEDGER
// =============================================================================

/// A dividend-paying token ledger
///
/// One instance is one authoritative, sequential state machine. Wrap it in
/// [`crate::SharedLedger`] to use it from several threads.
///
/// Committed operations append [`LedgerEvent`]s to an in-memory log that is
/// never truncated by the ledger itself. Hosts must call
/// [`drain_events`](Self::drain_events) regularly to bound its size.
#[derive(Debug)]
pub struct DividendLedger<G: PayoutGateway> {
    pub(crate) metadata: TokenMetadata,
    pub(crate) policy: PayoutPolicy,
    pub(crate) ledger: BalanceLedger,
    pub(crate) accumulator: DividendAccumulator,
    pub(crate) gateway: G,
    pub(crate) events: Vec<LedgerEvent>,
}

impl<G: PayoutGateway> DividendLedger<G> {
    /// Create an empty ledger
    pub fn new(metadata: TokenMetadata, policy: PayoutPolicy, gateway: G) -> Self {
        Self {
            metadata,
            policy,
            ledger: BalanceLedger::new(),
            accumulator: DividendAccumulator::new(),
            gateway,
            events: Vec::new(),
        }
    }

    /// Create a ledger and mint the configured genesis allocations
    pub fn from_config(config: &LedgerConfig, gateway: G) -> DividendResult<Self> {
        let mut ledger = Self::new(config.token.clone(), config.payout_policy, gateway);
        for allocation in &config.genesis {
            ledger.mint(allocation.address, allocation.amount as Amount)?;
        }

        info!(
            "Created {} ledger with {} genesis holders, supply {}",
            ledger.metadata.symbol,
            ledger.ledger.holder_count(),
            ledger.total_supply()
        );
        Ok(ledger)
    }

    // =========================================================================
    // Read-only queries
    // =========================================================================

    pub fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    pub fn payout_policy(&self) -> PayoutPolicy {
        self.policy
    }

    pub fn balance_of(&self, address: &Address) -> Amount {
        self.ledger.balance_of(address)
    }

    pub fn total_supply(&self) -> Amount {
        self.ledger.total_supply()
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.ledger.allowance(owner, spender)
    }

    /// Cumulative value ever deposited
    pub fn total_dividends(&self) -> Amount {
        self.accumulator.total_received()
    }

    /// Deposited value not yet paid out
    pub fn unclaimed_dividends(&self) -> Amount {
        self.accumulator.unclaimed()
    }

    pub fn points_per_share(&self) -> U256 {
        self.accumulator.points_per_share()
    }

    /// Entitlement `address` would receive if settled now
    pub fn pending_of(&self, address: &Address) -> DividendResult<Amount> {
        match self.ledger.account(address) {
            Some(account) => self.accumulator.pending_of(account),
            None => Ok(0),
        }
    }

    /// Cumulative dividends paid out to `address`
    pub fn withdrawn_of(&self, address: &Address) -> Amount {
        self.ledger
            .account(address)
            .map(|a| a.total_withdrawn)
            .unwrap_or(0)
    }

    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.ledger.account(address)
    }

    pub fn ledger(&self) -> &BalanceLedger {
        &self.ledger
    }

    pub fn accumulator(&self) -> &DividendAccumulator {
        &self.accumulator
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    /// Events emitted since the last drain
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Take every pending event, leaving the log empty
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    // =========================================================================
    // Deposits
    // =========================================================================

    /// Distribute `amount` over current holders.
    ///
    /// The value must already be in custody; the gateway is not involved.
    /// O(1) in the number of holders.
    pub fn deposit(&mut self, depositor: Address, amount: Amount) -> DividendResult<DepositOutcome> {
        let points_increment = self
            .accumulator
            .deposit(amount, self.ledger.total_supply())?;
        let points_per_share = self.accumulator.points_per_share();

        self.emit(LedgerEvent::DividendsDeposited {
            depositor,
            amount,
            points_per_share,
        });
        info!(
            "Deposited {} over supply {} from {}",
            amount,
            self.ledger.total_supply(),
            depositor
        );

        Ok(DepositOutcome {
            amount,
            points_increment,
            points_per_share,
        })
    }

    // =========================================================================
    // Balance-changing operations
    // =========================================================================

    /// Issue new tokens to `to`, settling its prior balance first
    pub fn mint(&mut self, to: Address, amount: Amount) -> DividendResult<SettlementOutcome> {
        self.ledger.check_mint(&to, amount)?;
        let outcome = self.settle_accounts(&[to], self.policy)?;

        let points = self.accumulator.points_per_share();
        self.ledger.apply_mint(to, amount, points);
        self.emit(LedgerEvent::Transfer {
            from: Address::NULL,
            to,
            value: amount,
        });
        info!("Minted {} to {}, supply now {}", amount, to, self.ledger.total_supply());

        Ok(outcome)
    }

    /// Move `amount` from `from` to `to`, settling both first
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> DividendResult<SettlementOutcome> {
        self.ledger.check_transfer(&from, &to, amount)?;
        let outcome = self.settle_accounts(&[from, to], self.policy)?;

        let points = self.accumulator.points_per_share();
        self.ledger.apply_transfer(from, to, amount, points);
        self.emit(LedgerEvent::Transfer { from, to, value: amount });
        debug!("Transferred {} from {} to {}", amount, from, to);

        Ok(outcome)
    }

    /// Move `amount` from `from` to `to` on behalf of `spender`
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> DividendResult<SettlementOutcome> {
        self.ledger.check_transfer(&from, &to, amount)?;
        let remaining = self.ledger.check_spend_allowance(&from, &spender, amount)?;
        let outcome = self.settle_accounts(&[from, to], self.policy)?;

        let points = self.accumulator.points_per_share();
        self.ledger.apply_transfer(from, to, amount, points);
        self.ledger.set_allowance(from, spender, remaining);
        self.emit(LedgerEvent::Transfer { from, to, value: amount });
        debug!(
            "Transferred {} from {} to {} via spender {}, allowance left {}",
            amount, from, to, spender, remaining
        );

        Ok(outcome)
    }

    /// Set the amount `spender` may move out of `owner`'s balance
    pub fn approve(&mut self, owner: Address, spender: Address, amount: Amount) {
        self.ledger.set_allowance(owner, spender, amount);
        self.emit(LedgerEvent::Approval {
            owner,
            spender,
            value: amount,
        });
        debug!("{} approved {} for {}", owner, spender, amount);
    }

    // =========================================================================
    // Settlement
    // =========================================================================

    /// Pay out everything pending for `account` without changing its balance.
    ///
    /// A failed payout fails the claim under either policy; there is no
    /// balance change to protect, so nothing is deferred.
    pub fn claim(&mut self, account: Address) -> DividendResult<Amount> {
        let mut plan = self.plan(&[account])?;
        let amount = plan.first().map(|s| s.amount).unwrap_or(0);
        if amount == 0 {
            return Err(DividendError::NothingToClaim);
        }

        self.deliver(&mut plan, PayoutPolicy::Abort)?;
        self.commit(&plan);
        info!("{} claimed {}", account, amount);

        Ok(amount)
    }

    /// Settle `account` against the accumulator under the ledger's policy.
    ///
    /// Unlike [`claim`](Self::claim) this succeeds with nothing pending and
    /// simply advances the checkpoint.
    pub fn settle(&mut self, account: Address) -> DividendResult<Settlement> {
        let outcome = self.settle_accounts(&[account], self.policy)?;
        outcome
            .settlements
            .first()
            .copied()
            .ok_or_else(|| DividendError::ConservationViolated("empty settlement".to_string()))
    }

    fn settle_accounts(
        &mut self,
        accounts: &[Address],
        policy: PayoutPolicy,
    ) -> DividendResult<SettlementOutcome> {
        let mut plan = self.plan(accounts)?;
        self.deliver(&mut plan, policy)?;
        self.commit(&plan);
        Ok(SettlementOutcome { settlements: plan })
    }

    /// Compute settlements for `accounts` (deduplicated, in order)
    fn plan(&self, accounts: &[Address]) -> DividendResult<Vec<Settlement>> {
        let points = self.accumulator.points_per_share();
        let mut plan: Vec<Settlement> = Vec::with_capacity(accounts.len());
        let mut total: Amount = 0;

        for address in accounts {
            if plan.iter().any(|s| s.account == *address) {
                continue;
            }

            let account = self.ledger.account_or_new(address, points);
            let amount = self.accumulator.pending_of(&account)?;
            total = total.checked_add(amount).ok_or(DividendError::Overflow)?;

            let status = if amount > 0 {
                SettlementStatus::Paid
            } else {
                SettlementStatus::Nothing
            };
            plan.push(Settlement {
                account: *address,
                amount,
                status,
            });
        }

        self.accumulator.check_withdrawal(total)?;
        Ok(plan)
    }

    /// Hand planned payouts to the gateway
    fn deliver(&mut self, plan: &mut [Settlement], policy: PayoutPolicy) -> DividendResult<()> {
        let payouts: Vec<Payout> = plan
            .iter()
            .filter(|s| s.status == SettlementStatus::Paid)
            .map(|s| Payout {
                to: s.account,
                amount: s.amount,
            })
            .collect();
        if payouts.is_empty() {
            return Ok(());
        }

        match policy {
            PayoutPolicy::Abort => {
                self.gateway.execute(&payouts).map_err(|e| {
                    warn!("Payout batch of {} failed, aborting: {}", payouts.len(), e);
                    DividendError::PayoutFailed(e.to_string())
                })?;
            }
            PayoutPolicy::Defer => {
                for settlement in plan.iter_mut().filter(|s| s.status == SettlementStatus::Paid) {
                    let payout = Payout {
                        to: settlement.account,
                        amount: settlement.amount,
                    };
                    if let Err(e) = self.gateway.execute(&[payout]) {
                        warn!(
                            "Payout of {} to {} failed, deferring: {}",
                            settlement.amount, settlement.account, e
                        );
                        settlement.status = SettlementStatus::Deferred;
                    }
                }
            }
        }
        Ok(())
    }

    /// Write delivered settlements and move checkpoints to now
    fn commit(&mut self, plan: &[Settlement]) {
        let points = self.accumulator.points_per_share();

        for settlement in plan {
            let account = self.ledger.account_entry(settlement.account, points);
            account.dividend_checkpoint = points;
            let event = match settlement.status {
                SettlementStatus::Paid => {
                    account.total_withdrawn += settlement.amount;
                    account.deferred = 0;
                    self.accumulator.record_withdrawal(settlement.amount);
                    Some(LedgerEvent::DividendsClaimed {
                        account: settlement.account,
                        amount: settlement.amount,
                    })
                }
                SettlementStatus::Deferred => {
                    account.deferred = settlement.amount;
                    Some(LedgerEvent::DividendDeferred {
                        account: settlement.account,
                        amount: settlement.amount,
                    })
                }
                SettlementStatus::Nothing => None,
            };
            if let Some(event) = event {
                self.emit(event);
            }

            debug!(
                "Settled {}: {} ({:?})",
                settlement.account, settlement.amount, settlement.status
            );
        }
    }

    fn emit(&mut self, event: LedgerEvent) {
        debug!("Event {}", event.kind());
        self.events.push(event);
    }

    // =========================================================================
    // Audit
    // =========================================================================

    /// Check every ledger-wide invariant. O(number of accounts).
    ///
    /// - `total_supply == sum(balances)`
    /// - `accumulator.total_withdrawn == sum(account.total_withdrawn)`
    /// - `0 <= unclaimed - sum(pending) <= truncation dust bound`
    pub fn verify_invariants(&self) -> DividendResult<()> {
        self.ledger.verify_supply()?;

        let mut pending_total: Amount = 0;
        let mut withdrawn_total: Amount = 0;
        for (_, account) in self.ledger.accounts() {
            let pending = self.accumulator.pending_of(account)?;
            pending_total = pending_total
                .checked_add(pending)
                .ok_or(DividendError::Overflow)?;
            withdrawn_total = withdrawn_total
                .checked_add(account.total_withdrawn)
                .ok_or(DividendError::Overflow)?;
        }

        if withdrawn_total != self.accumulator.total_withdrawn() {
            return Err(DividendError::ConservationViolated(format!(
                "accumulator withdrawn ({}) != sum of account withdrawals ({})",
                self.accumulator.total_withdrawn(),
                withdrawn_total
            )));
        }

        if self.accumulator.total_withdrawn() > self.accumulator.total_received() {
            return Err(DividendError::ConservationViolated(format!(
                "withdrawn ({}) exceeds received ({})",
                self.accumulator.total_withdrawn(),
                self.accumulator.total_received()
            )));
        }

        let unclaimed = self.accumulator.unclaimed();
        if pending_total > unclaimed {
            return Err(DividendError::ConservationViolated(format!(
                "pending ({}) exceeds unclaimed ({})",
                pending_total, unclaimed
            )));
        }

        let dust = unclaimed - pending_total;
        let bound = fixed_point::max_dust(
            self.accumulator.deposit_count(),
            self.accumulator.max_supply_at_deposit(),
        );
        if dust > bound {
            return Err(DividendError::ConservationViolated(format!(
                "dust ({}) exceeds bound ({})",
                dust, bound
            )));
        }
        Ok(())
    }
}
