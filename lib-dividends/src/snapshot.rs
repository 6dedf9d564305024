//! Ledger Snapshots
//!
//! A [`LedgerSnapshot`] is an owned, consistent copy of the whole ledger
//! state. It serves two purposes:
//! - read-only views for display collaborators that must not hold a lock
//! - JSON persistence and restore

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use lib_types::{address_hex, Address, Amount};

use crate::accumulator::DividendAccumulator;
use crate::config::TokenMetadata;
use crate::errors::{DividendError, DividendResult};
use crate::gateway::{PayoutGateway, PayoutPolicy};
use crate::ledger::{Account, BalanceLedger};
use crate::settlement::DividendLedger;

/// One account record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEntry {
    #[serde(with = "address_hex")]
    pub address: Address,
    pub account: Account,
}

/// One allowance record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceEntry {
    #[serde(with = "address_hex")]
    pub owner: Address,
    #[serde(with = "address_hex")]
    pub spender: Address,
    pub amount: Amount,
}

/// Point-in-time copy of a ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub metadata: TokenMetadata,
    pub payout_policy: PayoutPolicy,
    pub total_supply: Amount,
    pub accumulator: DividendAccumulator,
    /// Sorted by address
    pub accounts: Vec<AccountEntry>,
    /// Sorted by (owner, spender)
    pub allowances: Vec<AllowanceEntry>,
}

impl LedgerSnapshot {
    pub fn to_json(&self) -> DividendResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| DividendError::Snapshot(e.to_string()))
    }

    pub fn from_json(json: &str) -> DividendResult<Self> {
        serde_json::from_str(json).map_err(|e| DividendError::Snapshot(e.to_string()))
    }

    pub fn balance_of(&self, address: &Address) -> Amount {
        self.find(address).map(|a| a.balance).unwrap_or(0)
    }

    /// Entitlement of `address` as of this snapshot
    pub fn pending_of(&self, address: &Address) -> DividendResult<Amount> {
        match self.find(address) {
            Some(account) => self.accumulator.pending_of(account),
            None => Ok(0),
        }
    }

    pub fn total_dividends(&self) -> Amount {
        self.accumulator.total_received()
    }

    pub fn unclaimed_dividends(&self) -> Amount {
        self.accumulator.unclaimed()
    }

    fn find(&self, address: &Address) -> Option<&Account> {
        self.accounts
            .binary_search_by(|entry| entry.address.cmp(address))
            .ok()
            .map(|index| &self.accounts[index].account)
    }
}

impl<G: PayoutGateway> DividendLedger<G> {
    /// Capture the current state
    pub fn snapshot(&self) -> LedgerSnapshot {
        let mut accounts: Vec<AccountEntry> = self
            .ledger
            .accounts()
            .map(|(address, account)| AccountEntry {
                address: *address,
                account: account.clone(),
            })
            .collect();
        accounts.sort_by(|a, b| a.address.cmp(&b.address));

        let mut allowances: Vec<AllowanceEntry> = self
            .ledger
            .allowances()
            .map(|(owner, spender, amount)| AllowanceEntry {
                owner: *owner,
                spender: *spender,
                amount,
            })
            .collect();
        allowances.sort_by(|a, b| (a.owner, a.spender).cmp(&(b.owner, b.spender)));

        LedgerSnapshot {
            metadata: self.metadata.clone(),
            payout_policy: self.policy,
            total_supply: self.ledger.total_supply(),
            accumulator: self.accumulator.clone(),
            accounts,
            allowances,
        }
    }

    /// Rebuild a ledger from a snapshot, verifying every invariant
    pub fn restore(snapshot: LedgerSnapshot, gateway: G) -> DividendResult<Self> {
        let mut accounts = HashMap::with_capacity(snapshot.accounts.len());
        for entry in snapshot.accounts {
            if accounts.insert(entry.address, entry.account).is_some() {
                return Err(DividendError::Snapshot(format!(
                    "duplicate account {}",
                    entry.address
                )));
            }
        }

        let mut allowances: HashMap<Address, HashMap<Address, Amount>> = HashMap::new();
        for entry in snapshot.allowances {
            allowances
                .entry(entry.owner)
                .or_default()
                .insert(entry.spender, entry.amount);
        }

        let ledger = Self {
            metadata: snapshot.metadata,
            policy: snapshot.payout_policy,
            ledger: BalanceLedger::from_parts(snapshot.total_supply, accounts, allowances),
            accumulator: snapshot.accumulator,
            gateway,
            events: Vec::new(),
        };
        ledger.verify_invariants()?;

        tracing::info!(
            "Restored {} ledger: {} accounts, supply {}",
            ledger.metadata.symbol,
            ledger.ledger.accounts().count(),
            ledger.total_supply()
        );
        Ok(ledger)
    }
}
