//! Dividend Token Integration Tests
//!
//! End-to-end behavior of the public ledger API:
//! - ERC-20 style balances, transfers and allowances
//! - Accepting dividend deposits
//! - Distribution on claim, transfer and transferFrom

use lib_dividends::{
    CustodyGateway, DividendError, DividendLedger, GenesisAllocation, LedgerConfig, LedgerEvent,
    PayoutPolicy,
};
use lib_types::{Address, Amount};

// ============================================================================
// Test Utilities
// ============================================================================

/// One ether in wei
const VALUE: Amount = 1_000_000_000_000_000_000;

fn owner() -> Address {
    Address::new([1u8; 32])
}

fn recipient() -> Address {
    Address::new([2u8; 32])
}

fn another_account() -> Address {
    Address::new([3u8; 32])
}

/// Owner and recipient hold 50 tokens each
fn setup() -> DividendLedger<CustodyGateway> {
    let config = LedgerConfig {
        genesis: vec![GenesisAllocation { address: owner(), amount: 50 }],
        ..LedgerConfig::default()
    };
    let mut token = DividendLedger::from_config(&config, CustodyGateway::new()).unwrap();
    token.mint(recipient(), 50).unwrap();
    token
}

/// A payment from `another_account` lands in custody, then is distributed
fn send_value(token: &mut DividendLedger<CustodyGateway>, amount: Amount) -> Result<(), DividendError> {
    token.gateway_mut().fund(amount);
    token.deposit(another_account(), amount)?;
    Ok(())
}

// ============================================================================
// Total supply and balances
// ============================================================================

#[test]
fn total_supply_returns_all_tokens() {
    let token = setup();
    assert_eq!(token.total_supply(), 100);
}

#[test]
fn balance_of_account_without_tokens_is_zero() {
    let token = setup();
    assert_eq!(token.balance_of(&another_account()), 0);
}

#[test]
fn balance_of_account_with_tokens() {
    let token = setup();
    assert_eq!(token.balance_of(&owner()), 50);
}

// ============================================================================
// Transfer
// ============================================================================

#[test]
fn transfer_more_than_balance_reverts() {
    let mut token = setup();
    let before = token.snapshot();

    let result = token.transfer(owner(), recipient(), 51);
    assert_eq!(result, Err(DividendError::InsufficientBalance { have: 50, need: 51 }));
    assert_eq!(token.snapshot(), before);
}

#[test]
fn transfer_moves_requested_amount() {
    let mut token = setup();
    token.transfer(owner(), recipient(), 50).unwrap();

    assert_eq!(token.balance_of(&owner()), 0);
    assert_eq!(token.balance_of(&recipient()), 100);
}

#[test]
fn transfer_emits_transfer_event() {
    let mut token = setup();
    token.drain_events();
    token.transfer(owner(), recipient(), 50).unwrap();

    let events = token.drain_events();
    assert_eq!(
        events.last(),
        Some(&LedgerEvent::Transfer {
            from: owner(),
            to: recipient(),
            value: 50
        })
    );
}

#[test]
fn transfer_to_null_identity_reverts() {
    let mut token = setup();
    send_value(&mut token, VALUE).unwrap();
    let before = token.snapshot();

    assert_eq!(
        token.transfer(owner(), Address::NULL, 100),
        Err(DividendError::InvalidRecipient)
    );
    assert_eq!(token.snapshot(), before);
    assert_eq!(token.gateway().total_paid(), 0);
}

// ============================================================================
// Accepting payments
// ============================================================================

#[test]
fn accepts_payments_and_updates_totals() {
    let mut token = setup();
    send_value(&mut token, VALUE).unwrap();

    assert_eq!(token.total_dividends(), VALUE);
    assert_eq!(token.unclaimed_dividends(), VALUE);
}

#[test]
fn zero_valued_payment_reverts() {
    let mut token = setup();
    assert_eq!(send_value(&mut token, 0), Err(DividendError::InvalidDeposit));
    assert_eq!(token.total_dividends(), 0);
}

#[test]
fn payment_without_supply_reverts() {
    let mut token = DividendLedger::new(
        Default::default(),
        PayoutPolicy::Abort,
        CustodyGateway::new(),
    );
    assert_eq!(token.deposit(another_account(), 100), Err(DividendError::NoSupply));
    assert_eq!(token.total_dividends(), 0);
}

// ============================================================================
// Distributing dividends
// ============================================================================

#[test]
fn holders_can_claim_dividends() {
    let mut token = setup();
    send_value(&mut token, VALUE).unwrap();

    let claimed = token.claim(recipient()).unwrap();
    assert_eq!(claimed, VALUE / 2);
    assert_eq!(token.gateway().paid_to(&recipient()), VALUE / 2);
    assert_eq!(token.unclaimed_dividends(), VALUE / 2);
}

#[test]
fn transfer_distributes_dividends_to_both_parties() {
    let mut token = setup();
    send_value(&mut token, VALUE).unwrap();

    token.transfer(owner(), recipient(), 25).unwrap();

    assert_eq!(token.gateway().paid_to(&owner()), VALUE / 2);
    assert_eq!(token.gateway().paid_to(&recipient()), VALUE / 2);
    assert_eq!(token.balance_of(&owner()), 25);
    assert_eq!(token.balance_of(&recipient()), 75);
    assert_eq!(token.unclaimed_dividends(), 0);
}

#[test]
fn transfer_from_distributes_with_enough_allowance() {
    let mut token = setup();
    token.approve(owner(), another_account(), 25);
    send_value(&mut token, VALUE).unwrap();

    token
        .transfer_from(another_account(), owner(), recipient(), 25)
        .unwrap();

    assert_eq!(token.gateway().paid_to(&owner()), VALUE / 2);
    assert_eq!(token.gateway().paid_to(&recipient()), VALUE / 2);
    assert_eq!(token.allowance(&owner(), &another_account()), 0);
}

#[test]
fn transfer_from_beyond_allowance_reverts() {
    let mut token = setup();
    token.approve(owner(), another_account(), 25);
    send_value(&mut token, VALUE).unwrap();
    let before = token.snapshot();

    assert_eq!(
        token.transfer_from(another_account(), owner(), recipient(), 30),
        Err(DividendError::InsufficientAllowance { have: 25, need: 30 })
    );
    assert_eq!(token.snapshot(), before);
}

#[test]
fn late_minter_gets_share_of_later_deposits_only() {
    let mut token = setup();
    send_value(&mut token, VALUE).unwrap();

    let newcomer = Address::new([9u8; 32]);
    token.mint(newcomer, 100).unwrap();
    assert_eq!(token.pending_of(&newcomer).unwrap(), 0);

    send_value(&mut token, VALUE).unwrap();
    assert_eq!(token.pending_of(&newcomer).unwrap(), VALUE / 2);
    assert_eq!(token.pending_of(&owner()).unwrap(), VALUE / 2 + VALUE / 4);
    token.verify_invariants().unwrap();
}

#[test]
fn claim_is_idempotent_without_new_deposits() {
    let mut token = setup();
    send_value(&mut token, VALUE).unwrap();

    assert!(token.claim(owner()).unwrap() > 0);
    assert_eq!(token.claim(owner()), Err(DividendError::NothingToClaim));

    send_value(&mut token, VALUE).unwrap();
    assert_eq!(token.claim(owner()).unwrap(), VALUE / 2);
}

#[test]
fn gateway_outage_blocks_transfers_under_abort() {
    let mut token = setup();
    send_value(&mut token, VALUE).unwrap();
    token.gateway_mut().set_offline(true);
    let before = token.snapshot();

    assert!(matches!(
        token.transfer(owner(), recipient(), 10),
        Err(DividendError::PayoutFailed(_))
    ));
    assert_eq!(token.snapshot(), before);

    token.gateway_mut().set_offline(false);
    token.transfer(owner(), recipient(), 10).unwrap();
    assert_eq!(token.balance_of(&recipient()), 60);
}

#[test]
fn gateway_outage_defers_under_defer_policy() {
    let config = LedgerConfig {
        payout_policy: PayoutPolicy::Defer,
        genesis: vec![
            GenesisAllocation { address: owner(), amount: 50 },
            GenesisAllocation { address: recipient(), amount: 50 },
        ],
        ..LedgerConfig::default()
    };
    let mut token = DividendLedger::from_config(&config, CustodyGateway::new()).unwrap();
    send_value(&mut token, VALUE).unwrap();
    token.gateway_mut().set_offline(true);

    let outcome = token.transfer(owner(), recipient(), 10).unwrap();
    assert_eq!(outcome.total_paid(), 0);
    assert_eq!(outcome.deferred_to(&owner()), VALUE / 2);
    assert_eq!(token.balance_of(&recipient()), 60);
    assert_eq!(token.pending_of(&owner()).unwrap(), VALUE / 2);
    assert!(token
        .events()
        .iter()
        .any(|e| matches!(e, LedgerEvent::DividendDeferred { .. })));

    token.gateway_mut().set_offline(false);
    assert_eq!(token.claim(owner()).unwrap(), VALUE / 2);
    assert_eq!(token.claim(recipient()).unwrap(), VALUE / 2);
    assert_eq!(token.unclaimed_dividends(), 0);
    token.verify_invariants().unwrap();
}

// ============================================================================
// Token-scale amounts (18 decimals)
// ============================================================================

/// Holder with almost all of a ~1e24 supply plus a 14-unit holder; seven
/// 100-token deposits accumulate before anyone settles
fn whale_ledger() -> (DividendLedger<CustodyGateway>, Address, Address) {
    let whale = Address::new([7u8; 32]);
    let minnow = Address::new([8u8; 32]);
    let mut token = DividendLedger::new(
        Default::default(),
        PayoutPolicy::Abort,
        CustodyGateway::new(),
    );
    token.mint(whale, 999_999_999_999_999_999_999_993).unwrap();
    token.mint(minnow, 14).unwrap();
    for _ in 0..7 {
        send_value(&mut token, 100 * VALUE).unwrap();
    }
    (token, whale, minnow)
}

#[test]
fn unsettled_token_scale_entitlement_stays_claimable() {
    let (mut token, whale, _) = whale_ledger();

    let pending = token.pending_of(&whale).unwrap();
    assert!(pending <= 700 * VALUE);
    assert!(700 * VALUE - pending < 10_000_000);
    token.verify_invariants().unwrap();

    assert_eq!(token.claim(whale).unwrap(), pending);
    assert_eq!(token.gateway().paid_to(&whale), pending);
    token.verify_invariants().unwrap();
}

#[test]
fn unsettled_token_scale_entitlement_does_not_block_transfers() {
    let (mut token, whale, minnow) = whale_ledger();
    let pending = token.pending_of(&whale).unwrap();

    let outcome = token.transfer(whale, minnow, VALUE).unwrap();
    assert_eq!(outcome.paid_to(&whale), pending);
    assert_eq!(token.balance_of(&minnow), VALUE + 14);

    // Further deposits keep accruing after settlement
    send_value(&mut token, 100 * VALUE).unwrap();
    assert!(token.pending_of(&whale).unwrap() > 99 * VALUE);
    token.verify_invariants().unwrap();
}

#[test]
fn deposits_beyond_u128_scaled_range_are_accepted() {
    let mut token = DividendLedger::new(
        Default::default(),
        PayoutPolicy::Abort,
        CustodyGateway::new(),
    );
    token.mint(owner(), 500_000 * VALUE).unwrap();
    token.mint(recipient(), 500_000 * VALUE).unwrap();

    // 1000 tokens: amount * 1e18 no longer fits in 128 bits
    send_value(&mut token, 1_000 * VALUE).unwrap();
    assert_eq!(token.pending_of(&owner()).unwrap(), 500 * VALUE);
    assert_eq!(token.claim(recipient()).unwrap(), 500 * VALUE);
}

#[test]
fn repeated_large_deposits_over_tiny_supply() {
    let mut token = DividendLedger::new(
        Default::default(),
        PayoutPolicy::Abort,
        CustodyGateway::new(),
    );
    token.mint(owner(), 7).unwrap();

    for _ in 0..20 {
        send_value(&mut token, 333_333_333_333_333_333_333).unwrap();
    }
    assert_eq!(token.total_dividends(), 20 * 333_333_333_333_333_333_333);
    let pending = token.pending_of(&owner()).unwrap();
    assert!(token.total_dividends() - pending <= 20 * 7);
    assert_eq!(token.claim(owner()).unwrap(), pending);
    token.verify_invariants().unwrap();
}
