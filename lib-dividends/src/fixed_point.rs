//! Scaled-integer helpers for per-share math
//!
//! All per-share quantities are [`U256`] integers scaled by [`SCALE`]. Token
//! amounts stay [`Amount`] (u128); the wider type only carries points, and
//! products of points and balances are formed in 512 bits before dividing.
//! Division always truncates toward zero. A single deposit of `amount` spread
//! over `supply` shares therefore loses at most `supply - 1` smallest units
//! to truncation; that dust stays in custody and is never paid out or
//! double-counted.

use primitive_types::{U256, U512};

use lib_types::Amount;

use crate::errors::{DividendError, DividendResult};

/// Fixed-point scale applied to points-per-share (10^18)
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// `amount * SCALE`. Cannot overflow: the result is below 2^188.
pub fn scale_up(amount: Amount) -> U256 {
    U256::from(amount) * U256::from(SCALE)
}

/// `floor(a * b / denom)` with a 512-bit intermediate product.
///
/// Fails only when the quotient itself does not fit in 256 bits.
pub fn mul_div_floor(a: U256, b: U256, denom: U256) -> DividendResult<U256> {
    if denom.is_zero() {
        return Err(DividendError::DivisionByZero);
    }
    if a.is_zero() || b.is_zero() {
        return Ok(U256::zero());
    }

    let quotient = a.full_mul(b) / U512::from(denom);
    U256::try_from(quotient).map_err(|_| DividendError::Overflow)
}

/// Narrow a point-derived value back to a token amount
pub fn to_amount(value: U256) -> DividendResult<Amount> {
    if value > U256::from(Amount::MAX) {
        return Err(DividendError::Overflow);
    }
    Ok(value.low_u128())
}

/// Points-per-share increment for a deposit of `amount` over `supply` shares
pub fn points_for(amount: Amount, supply: Amount) -> DividendResult<U256> {
    if supply == 0 {
        return Err(DividendError::DivisionByZero);
    }
    Ok(scale_up(amount) / U256::from(supply))
}

/// Entitlement accrued by `balance` shares over a points delta
pub fn accrued(delta_points: U256, balance: Amount) -> DividendResult<Amount> {
    let value = mul_div_floor(delta_points, U256::from(balance), U256::from(SCALE))?;
    to_amount(value)
}

/// Upper bound on truncation dust after `deposits` deposits,
/// each made over at most `max_supply` shares.
pub fn max_dust(deposits: u64, max_supply: Amount) -> Amount {
    (deposits as Amount).saturating_mul(max_supply.max(1))
}
