//! Value-Transfer Gateway
//!
//! The ledger never moves external funds itself. Every payout produced by a
//! settlement is handed to a [`PayoutGateway`], the narrow seam behind which
//! the host wires its real custody (bank rail, chain client, ...).
//!
//! [`PayoutPolicy`] decides what a failed payout does to the enclosing
//! operation; it is applied by the settlement engine, so a gateway only has
//! to honour the all-or-nothing contract of [`PayoutGateway::execute`].

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lib_types::{Address, Amount};

/// A single outgoing dividend payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub to: Address,
    pub amount: Amount,
}

/// Error reported by a gateway
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Payout to {to} rejected: {reason}")]
    Rejected { to: Address, reason: String },

    #[error("Insufficient custody funds: available {available}, requested {requested}")]
    InsufficientCustody { available: Amount, requested: Amount },

    #[error("Gateway unavailable: {0}")]
    Unavailable(String),
}

/// Trait for executing dividend payouts
pub trait PayoutGateway {
    /// Execute a batch of payouts.
    ///
    /// Must be all-or-nothing: on `Err`, no payout in the batch has moved
    /// any funds.
    fn execute(&mut self, payouts: &[Payout]) -> Result<(), GatewayError>;
}

impl<G: PayoutGateway + ?Sized> PayoutGateway for Box<G> {
    fn execute(&mut self, payouts: &[Payout]) -> Result<(), GatewayError> {
        (**self).execute(payouts)
    }
}

/// What a failed payout does to a balance-changing operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutPolicy {
    /// Fail the whole operation; no state changes
    #[default]
    Abort,
    /// Keep the undelivered amount as claimable credit and continue
    Defer,
}

// =============================================================================
// IN-MEMORY CUSTODY
// =============================================================================

/// In-memory custody account
///
/// Holds deposited value and records what each identity has been paid.
/// Individual recipients can be blocked and the whole gateway taken offline
/// to exercise failure handling.
#[derive(Debug, Clone, Default)]
pub struct CustodyGateway {
    custody: Amount,
    paid: HashMap<Address, Amount>,
    blocked: HashSet<Address>,
    offline: bool,
}

impl CustodyGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive external value into custody (the deposit side)
    pub fn fund(&mut self, amount: Amount) {
        self.custody = self.custody.saturating_add(amount);
    }

    /// Value currently held in custody
    pub fn custody(&self) -> Amount {
        self.custody
    }

    /// Total paid to an identity so far
    pub fn paid_to(&self, address: &Address) -> Amount {
        self.paid.get(address).copied().unwrap_or(0)
    }

    /// Total paid to everyone
    pub fn total_paid(&self) -> Amount {
        self.paid.values().sum()
    }

    /// Refuse every payout to `address` until unblocked
    pub fn block(&mut self, address: Address) {
        self.blocked.insert(address);
    }

    pub fn unblock(&mut self, address: &Address) {
        self.blocked.remove(address);
    }

    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }
}

impl PayoutGateway for CustodyGateway {
    fn execute(&mut self, payouts: &[Payout]) -> Result<(), GatewayError> {
        if self.offline {
            return Err(GatewayError::Unavailable("custody offline".to_string()));
        }

        // Validate the whole batch before moving anything
        let mut requested: Amount = 0;
        for payout in payouts {
            if self.blocked.contains(&payout.to) {
                return Err(GatewayError::Rejected {
                    to: payout.to,
                    reason: "recipient blocked".to_string(),
                });
            }
            requested = requested.saturating_add(payout.amount);
        }
        if requested > self.custody {
            return Err(GatewayError::InsufficientCustody {
                available: self.custody,
                requested,
            });
        }

        self.custody -= requested;
        for payout in payouts {
            *self.paid.entry(payout.to).or_insert(0) += payout.amount;
        }
        Ok(())
    }
}
