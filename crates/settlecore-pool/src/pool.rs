//! A single constant-product pool and its pricing.
//!
//! Each side's custody coin is that side's reserve. Fees taken on a side
//! stay inside its reserve and keep earning on the curve until collected;
//! `fees_collected_*` only records how much of the reserve belongs to the
//! admin as fees. Liquidity removal and payouts are limited to the part of
//! the reserve above that amount, so `fees_collected_* <= reserve_*` always
//! holds.

use serde::{Deserialize, Serialize};
use settlecore_ledger::{Coin, CoinRejection};
use settlecore_types::{Direction, PoolKey, Result, SettleError, constants, math};

/// The outcome of pricing a trade against a pool, before it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub direction: Direction,
    pub amount_in: u64,
    /// Input after the fee, the part that moves the curve.
    pub amount_in_net: u64,
    pub fee: u64,
    pub amount_out: u64,
    /// How far the net input moves the input reserve:
    /// `net * 10000 / (reserve_in + net)`.
    pub price_impact_bps: u64,
}

/// Read-only copy of a pool returned by queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    pub key: PoolKey,
    pub reserve_x: u64,
    pub reserve_y: u64,
    pub fees_collected_x: u64,
    pub fees_collected_y: u64,
    pub swap_count: u64,
}

#[derive(Debug)]
pub(crate) struct Pool {
    key: PoolKey,
    custody_x: Coin,
    custody_y: Coin,
    fees_collected_x: u64,
    fees_collected_y: u64,
    swap_count: u64,
}

impl Pool {
    pub(crate) fn new(key: PoolKey, custody_x: Coin, custody_y: Coin) -> Self {
        Self {
            key,
            custody_x,
            custody_y,
            fees_collected_x: 0,
            fees_collected_y: 0,
            swap_count: 0,
        }
    }

    pub(crate) fn reserve_x(&self) -> u64 {
        self.custody_x.value()
    }

    pub(crate) fn reserve_y(&self) -> u64 {
        self.custody_y.value()
    }

    /// Reserve above the uncollected fees: what liquidity removal and
    /// payouts may take.
    fn free_x(&self) -> u64 {
        self.reserve_x() - self.fees_collected_x
    }

    fn free_y(&self) -> u64 {
        self.reserve_y() - self.fees_collected_y
    }

    /// `(reserve_in, reserve_out, free_out)` for a trade in `direction`.
    fn sides(&self, direction: Direction) -> (u64, u64, u64) {
        match direction {
            Direction::XToY => (self.reserve_x(), self.reserve_y(), self.free_y()),
            Direction::YToX => (self.reserve_y(), self.reserve_x(), self.free_x()),
        }
    }

    pub(crate) fn info(&self) -> PoolInfo {
        PoolInfo {
            key: self.key.clone(),
            reserve_x: self.reserve_x(),
            reserve_y: self.reserve_y(),
            fees_collected_x: self.fees_collected_x,
            fees_collected_y: self.fees_collected_y,
            swap_count: self.swap_count,
        }
    }

    /// Price `amount_in` against the current reserves without changing anything.
    ///
    /// # Errors
    /// - `ZeroAmount` if `amount_in` or the resulting output is 0
    /// - `InsufficientLiquidity` if a reserve is empty, or the payout would
    ///   leave the output side with nothing above its uncollected fees
    pub(crate) fn quote(
        &self,
        direction: Direction,
        amount_in: u64,
        fee_bps: u64,
    ) -> Result<SwapQuote> {
        if amount_in == 0 {
            return Err(SettleError::ZeroAmount);
        }
        let (reserve_in, reserve_out, free_out) = self.sides(direction);
        if reserve_in == 0 || reserve_out == 0 {
            return Err(SettleError::InsufficientLiquidity);
        }
        let (amount_in_net, fee) = math::split_fee(amount_in, fee_bps)?;
        let amount_out = math::constant_product_out(reserve_in, reserve_out, amount_in_net)?;
        if amount_out >= free_out {
            return Err(SettleError::InsufficientLiquidity);
        }
        if amount_out == 0 {
            return Err(SettleError::ZeroAmount);
        }
        let price_impact_bps = math::mul_div(
            amount_in_net,
            constants::BPS_DENOMINATOR,
            reserve_in + amount_in_net,
        )?;
        Ok(SwapQuote {
            direction,
            amount_in,
            amount_in_net,
            fee,
            amount_out,
            price_impact_bps,
        })
    }

    /// `reserve_y * PRICE_SCALE / reserve_x`.
    pub(crate) fn price(&self) -> Result<u64> {
        let reserve_x = self.reserve_x();
        if reserve_x == 0 {
            return Err(SettleError::InsufficientLiquidity);
        }
        math::mul_div(
            self.reserve_y(),
            constants::PRICE_SCALE,
            reserve_x,
        )
    }

    /// Apply a quote computed under the same lock: pay out of the other
    /// side, absorb `coin_in` and book the fee on the input side. Nothing
    /// changes unless every step succeeds.
    pub(crate) fn apply(
        &mut self,
        quote: &SwapQuote,
        coin_in: Coin,
    ) -> std::result::Result<Coin, CoinRejection> {
        if coin_in.value() != quote.amount_in {
            let error = SettleError::Internal(format!(
                "quoted {} but received {}",
                quote.amount_in,
                coin_in.value()
            ));
            return Err(CoinRejection::new(error, coin_in));
        }
        let (custody_in, custody_out, fees_in) = match quote.direction {
            Direction::XToY => (
                &mut self.custody_x,
                &mut self.custody_y,
                &mut self.fees_collected_x,
            ),
            Direction::YToX => (
                &mut self.custody_y,
                &mut self.custody_x,
                &mut self.fees_collected_y,
            ),
        };
        if coin_in.asset() != custody_in.asset() {
            let error = SettleError::AssetMismatch {
                expected: custody_in.asset().to_string(),
                actual: coin_in.asset().to_string(),
            };
            return Err(CoinRejection::new(error, coin_in));
        }
        let coin_out = match custody_out.extract(quote.amount_out) {
            Ok(coin) => coin,
            Err(error) => return Err(CoinRejection::new(error, coin_in)),
        };
        // Asset checked above, so the merge can't be refused.
        custody_in.merge(coin_in)?;
        *fees_in += quote.fee;
        self.swap_count += 1;
        Ok(coin_out)
    }

    /// Add to both custody sides.
    pub(crate) fn deposit(
        &mut self,
        coin_x: Coin,
        coin_y: Coin,
    ) -> std::result::Result<(), CoinRejection> {
        self.custody_x.merge(coin_x)?;
        self.custody_y.merge(coin_y)
    }

    /// Take `amount_x`/`amount_y` out of the reserves, leaving the
    /// uncollected fees behind.
    pub(crate) fn withdraw(&mut self, amount_x: u64, amount_y: u64) -> Result<(Coin, Coin)> {
        if amount_x > self.free_x() || amount_y > self.free_y() {
            return Err(SettleError::InsufficientLiquidity);
        }
        Ok((
            self.custody_x.extract(amount_x)?,
            self.custody_y.extract(amount_y)?,
        ))
    }

    /// Move the accumulated fees out and reset the counters.
    pub(crate) fn take_fees(&mut self) -> Result<(Coin, Coin)> {
        let fee_x = self.custody_x.extract(self.fees_collected_x)?;
        let fee_y = self.custody_y.extract(self.fees_collected_y)?;
        self.fees_collected_x = 0;
        self.fees_collected_y = 0;
        Ok((fee_x, fee_y))
    }

    /// Value of `asset` in this pool's reserves, fees included.
    pub(crate) fn held(&self, asset: &str) -> u64 {
        [&self.custody_x, &self.custody_y]
            .into_iter()
            .filter(|c| c.asset() == asset)
            .map(Coin::value)
            .sum()
    }
}
