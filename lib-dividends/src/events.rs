//! Ledger Events
//!
//! Every committed state change appends notices to the ledger's event log.
//! Downstream observers can replay them to reconcile balances and dividend
//! totals independently of the ledger.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use lib_types::{Address, Amount};

/// Notices emitted by the dividend ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LedgerEvent {
    /// Tokens moved between accounts (`from` is null for mints)
    Transfer {
        from: Address,
        to: Address,
        value: Amount,
    },

    /// Allowance set by `owner` for `spender`
    Approval {
        owner: Address,
        spender: Address,
        value: Amount,
    },

    /// External value deposited for distribution
    DividendsDeposited {
        depositor: Address,
        amount: Amount,
        /// Points-per-share after the deposit
        points_per_share: U256,
    },

    /// Dividends paid out to an account
    DividendsClaimed {
        account: Address,
        amount: Amount,
    },

    /// Payout failed under the defer policy; amount stays claimable
    DividendDeferred {
        account: Address,
        amount: Amount,
    },
}

impl LedgerEvent {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerEvent::Transfer { .. } => "Transfer",
            LedgerEvent::Approval { .. } => "Approval",
            LedgerEvent::DividendsDeposited { .. } => "DividendsDeposited",
            LedgerEvent::DividendsClaimed { .. } => "DividendsClaimed",
            LedgerEvent::DividendDeferred { .. } => "DividendDeferred",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_names_variant() {
        let event = LedgerEvent::DividendsClaimed {
            account: Address::new([1u8; 32]),
            amount: 50,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["DividendsClaimed"]["amount"], 50);
        assert_eq!(event.kind(), "DividendsClaimed");
    }
}
