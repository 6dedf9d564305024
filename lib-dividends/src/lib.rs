//! Proportional Dividend Ledger
//!
//! A token balance registry in which deposits of external value are shared
//! among current holders strictly in proportion to their holdings, without
//! iterating over holders on deposit.
//!
//! # Key Types
//!
//! - [`DividendLedger`]: the settlement engine and public operations
//! - [`BalanceLedger`]: balances, supply and allowances
//! - [`DividendAccumulator`]: scaled points-per-share running total ([`U256`])
//! - [`PayoutGateway`]: seam to the external value-transfer collaborator
//! - [`SharedLedger`]: single-writer handle for multi-threaded hosts
//!
//! # Rules
//!
//! 1. **Settle before mutate**: an account's entitlement is always computed
//!    from its balance as it was immediately before the change
//! 2. **No retroactive dividends**: new accounts start at the current points
//! 3. **Atomic operations**: any error leaves the ledger untouched
//!
//! # Usage
//!
//! ```ignore
//! use lib_dividends::{CustodyGateway, DividendLedger, PayoutPolicy, TokenMetadata};
//!
//! let mut ledger = DividendLedger::new(TokenMetadata::default(), PayoutPolicy::Abort, CustodyGateway::new());
//! ledger.mint(alice, 50)?;
//! ledger.mint(bob, 50)?;
//! ledger.gateway_mut().fund(100);
//! ledger.deposit(payer, 100)?;
//! assert_eq!(ledger.pending_of(&alice)?, 50);
//! ```

pub mod accumulator;
pub mod config;
pub mod errors;
pub mod events;
pub mod fixed_point;
pub mod gateway;
pub mod ledger;
pub mod settlement;
pub mod shared;
pub mod snapshot;

pub use accumulator::DividendAccumulator;
pub use config::{load_config, GenesisAllocation, LedgerConfig, TokenMetadata};
pub use errors::{DividendError, DividendResult};
pub use events::LedgerEvent;
pub use fixed_point::SCALE;
pub use gateway::{CustodyGateway, GatewayError, Payout, PayoutGateway, PayoutPolicy};
pub use ledger::{Account, BalanceLedger};
pub use settlement::{DepositOutcome, DividendLedger, Settlement, SettlementOutcome, SettlementStatus};
pub use shared::SharedLedger;
pub use snapshot::{AccountEntry, AllowanceEntry, LedgerSnapshot};

/// 256-bit unsigned integer carrying scaled points-per-share
pub use primitive_types::U256;
