//! Thread-safe ledger handle
//!
//! One writer at a time: every mutating call holds the write lock for its
//! whole plan/deliver/commit cycle, including the gateway call. Readers take
//! the read lock and only ever observe committed state.

use std::sync::Arc;

use parking_lot::RwLock;

use lib_types::{Address, Amount};

use crate::errors::DividendResult;
use crate::events::LedgerEvent;
use crate::gateway::PayoutGateway;
use crate::settlement::{DepositOutcome, DividendLedger, SettlementOutcome};
use crate::snapshot::LedgerSnapshot;

/// Cloneable handle to a ledger shared between threads
pub struct SharedLedger<G: PayoutGateway> {
    inner: Arc<RwLock<DividendLedger<G>>>,
}

impl<G: PayoutGateway> Clone for SharedLedger<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G: PayoutGateway> SharedLedger<G> {
    pub fn new(ledger: DividendLedger<G>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    // Writers

    pub fn deposit(&self, depositor: Address, amount: Amount) -> DividendResult<DepositOutcome> {
        self.inner.write().deposit(depositor, amount)
    }

    pub fn mint(&self, to: Address, amount: Amount) -> DividendResult<SettlementOutcome> {
        self.inner.write().mint(to, amount)
    }

    pub fn transfer(&self, from: Address, to: Address, amount: Amount) -> DividendResult<SettlementOutcome> {
        self.inner.write().transfer(from, to, amount)
    }

    pub fn transfer_from(
        &self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> DividendResult<SettlementOutcome> {
        self.inner.write().transfer_from(spender, from, to, amount)
    }

    pub fn approve(&self, owner: Address, spender: Address, amount: Amount) {
        self.inner.write().approve(owner, spender, amount)
    }

    pub fn claim(&self, account: Address) -> DividendResult<Amount> {
        self.inner.write().claim(account)
    }

    pub fn drain_events(&self) -> Vec<LedgerEvent> {
        self.inner.write().drain_events()
    }

    /// Run `f` with exclusive access (e.g. to fund the gateway)
    pub fn with_ledger_mut<R>(&self, f: impl FnOnce(&mut DividendLedger<G>) -> R) -> R {
        f(&mut self.inner.write())
    }

    // Readers

    pub fn balance_of(&self, address: &Address) -> Amount {
        self.inner.read().balance_of(address)
    }

    pub fn pending_of(&self, address: &Address) -> DividendResult<Amount> {
        self.inner.read().pending_of(address)
    }

    pub fn total_supply(&self) -> Amount {
        self.inner.read().total_supply()
    }

    pub fn total_dividends(&self) -> Amount {
        self.inner.read().total_dividends()
    }

    pub fn unclaimed_dividends(&self) -> Amount {
        self.inner.read().unclaimed_dividends()
    }

    /// Consistent owned copy for lock-free reading
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.inner.read().snapshot()
    }

    pub fn with_ledger<R>(&self, f: impl FnOnce(&DividendLedger<G>) -> R) -> R {
        f(&self.inner.read())
    }
}
