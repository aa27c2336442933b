//! Integer arithmetic shared by the pool and router.
//!
//! Amounts are `u64`. Every product is formed in `u128`, divided, and then
//! narrowed back; a result that does not fit in `u64` is an
//! [`SettleError::ArithmeticOverflow`]. All division floors.

use crate::{Result, SettleError, constants::BPS_DENOMINATOR};

/// `floor(a * b / denom)`.
pub fn mul_div(a: u64, b: u64, denom: u64) -> Result<u64> {
    if denom == 0 {
        return Err(SettleError::ArithmeticOverflow);
    }
    let wide = u128::from(a) * u128::from(b) / u128::from(denom);
    u64::try_from(wide).map_err(|_| SettleError::ArithmeticOverflow)
}

/// `floor(amount * bps / 10000)`.
pub fn bps_of(amount: u64, bps: u64) -> Result<u64> {
    mul_div(amount, bps, BPS_DENOMINATOR)
}

/// Split `amount` into `(net, fee)` for an input fee of `fee_bps`.
///
/// `net = floor(amount * (10000 - fee_bps) / 10000)` and the fee is the
/// remainder, so `net + fee == amount` always holds.
pub fn split_fee(amount: u64, fee_bps: u64) -> Result<(u64, u64)> {
    let keep = BPS_DENOMINATOR
        .checked_sub(fee_bps)
        .ok_or(SettleError::ArithmeticOverflow)?;
    let net = mul_div(amount, keep, BPS_DENOMINATOR)?;
    Ok((net, amount - net))
}

/// Constant-product output: `floor(reserve_out * net_in / (reserve_in + net_in))`.
pub fn constant_product_out(reserve_in: u64, reserve_out: u64, net_in: u64) -> Result<u64> {
    let denom = reserve_in
        .checked_add(net_in)
        .ok_or(SettleError::ArithmeticOverflow)?;
    mul_div(reserve_out, net_in, denom)
}

/// `(best - worst) * 10000 / worst` when `worst > 0 && best > worst`, else 0.
pub fn price_diff_bps(best: u64, worst: u64) -> Result<u64> {
    if worst == 0 || best <= worst {
        return Ok(0);
    }
    mul_div(best - worst, BPS_DENOMINATOR, worst)
}
