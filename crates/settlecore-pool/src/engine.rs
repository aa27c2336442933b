//! Escrow pool engine.
//!
//! Pools live in a map keyed by [`PoolKey`], each behind its own lock.
//! A swap holds its pool's lock from quote to payout, so the amount it
//! was quoted is the amount it gets.

use std::{collections::HashMap, sync::Arc};

use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use settlecore_ledger::{Coin, CoinRejection, EventSink, LedgerAccess};
use settlecore_types::{
    AccountId, Authority, Clock, Direction, Event, EventRecord, PoolConfig, PoolKey, Result,
    SettleError, TokenPair, constants::PRICE_PRECISION,
};

use crate::pool::{Pool, PoolInfo, SwapQuote};

/// Admin-owned constant-product pools charging a fee on every input.
pub struct EscrowPoolEngine {
    config: PoolConfig,
    authority: Authority,
    pools: RwLock<HashMap<PoolKey, Arc<Mutex<Pool>>>>,
    ledger: Arc<dyn LedgerAccess>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl EscrowPoolEngine {
    /// # Errors
    /// Returns `Configuration` if `config` is invalid.
    pub fn new(
        config: PoolConfig,
        authority: Authority,
        ledger: Arc<dyn LedgerAccess>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            authority,
            pools: RwLock::new(HashMap::new()),
            ledger,
            events,
            clock,
        })
    }

    #[must_use]
    pub fn fee_bps(&self) -> u64 {
        self.config.fee_bps
    }

    fn pool(&self, key: &PoolKey) -> Result<Arc<Mutex<Pool>>> {
        self.pools
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| SettleError::not_found(key.to_string()))
    }

    /// Withdraw both sides from `account`, putting the first back if the
    /// second can't be funded.
    fn withdraw_pair(
        &self,
        account: AccountId,
        pair: &TokenPair,
        amount_x: u64,
        amount_y: u64,
    ) -> Result<(Coin, Coin)> {
        let coin_x = self.ledger.withdraw(account, &pair.x, amount_x)?;
        match self.ledger.withdraw(account, &pair.y, amount_y) {
            Ok(coin_y) => Ok((coin_x, coin_y)),
            Err(e) => {
                self.ledger.deposit(account, coin_x);
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------
    // Admin
    // -----------------------------------------------------------------

    /// Open a pool for `pair` owned by the admin, seeded from the admin's balance.
    ///
    /// # Errors
    /// - `NotAuthorized` if `caller` isn't the admin
    /// - `ZeroAmount` if either initial reserve is 0
    /// - `AlreadyInitialized` if the admin already has a pool for `pair`
    /// - `InsufficientBalance` if the admin can't fund the reserves
    pub fn create_pool(
        &self,
        caller: AccountId,
        pair: &TokenPair,
        initial_x: u64,
        initial_y: u64,
    ) -> Result<PoolKey> {
        let token = self.authority.authorize(caller)?;
        if initial_x == 0 || initial_y == 0 {
            return Err(SettleError::ZeroAmount);
        }
        let key = PoolKey::new(token.admin(), pair.clone());

        let mut pools = self.pools.write();
        if pools.contains_key(&key) {
            return Err(SettleError::AlreadyInitialized);
        }
        let (coin_x, coin_y) = self.withdraw_pair(token.admin(), pair, initial_x, initial_y)?;
        pools.insert(
            key.clone(),
            Arc::new(Mutex::new(Pool::new(key.clone(), coin_x, coin_y))),
        );
        drop(pools);

        let now = self.clock.now();
        tracing::info!(
            pool = %key,
            reserve_x = initial_x,
            reserve_y = initial_y,
            fee_bps = self.config.fee_bps,
            "Pool created"
        );
        self.events.emit(EventRecord::new(
            key.owner,
            Event::PoolCreated {
                owner: key.owner,
                pair: pair.clone(),
                reserve_x: initial_x,
                reserve_y: initial_y,
                timestamp: now,
            },
        ));
        Ok(key)
    }

    /// Move more of both assets from the admin into the reserves.
    ///
    /// # Errors
    /// - `NotAuthorized` if `caller` isn't the admin
    /// - `ZeroAmount` if both amounts are 0
    /// - `NotFound` if the admin has no pool for `pair`
    /// - `InsufficientBalance` if the admin can't fund the amounts
    pub fn add_liquidity(
        &self,
        caller: AccountId,
        pair: &TokenPair,
        amount_x: u64,
        amount_y: u64,
    ) -> Result<()> {
        let token = self.authority.authorize(caller)?;
        if amount_x == 0 && amount_y == 0 {
            return Err(SettleError::ZeroAmount);
        }
        let key = PoolKey::new(token.admin(), pair.clone());
        let pool = self.pool(&key)?;
        let mut pool = pool.lock();

        let (coin_x, coin_y) = self.withdraw_pair(token.admin(), pair, amount_x, amount_y)?;
        if let Err(rejection) = pool.deposit(coin_x, coin_y) {
            let (err, refund) = rejection.into_parts();
            self.ledger.deposit(token.admin(), refund);
            return Err(err);
        }

        tracing::info!(pool = %key, amount_x, amount_y, "Liquidity added");
        self.events.emit(EventRecord::new(
            key.owner,
            Event::LiquidityAdded {
                owner: key.owner,
                amount_x,
                amount_y,
                timestamp: self.clock.now(),
            },
        ));
        Ok(())
    }

    /// Return part of the reserves to the admin. Uncollected fees can't be
    /// withdrawn this way.
    ///
    /// # Errors
    /// - `NotAuthorized` if `caller` isn't the admin
    /// - `ZeroAmount` if both amounts are 0
    /// - `NotFound` if the admin has no pool for `pair`
    /// - `InsufficientLiquidity` if either amount exceeds its reserve less
    ///   the uncollected fees on that side
    pub fn remove_liquidity(
        &self,
        caller: AccountId,
        pair: &TokenPair,
        amount_x: u64,
        amount_y: u64,
    ) -> Result<()> {
        let token = self.authority.authorize(caller)?;
        if amount_x == 0 && amount_y == 0 {
            return Err(SettleError::ZeroAmount);
        }
        let key = PoolKey::new(token.admin(), pair.clone());
        let pool = self.pool(&key)?;
        let mut pool = pool.lock();

        let (coin_x, coin_y) = pool.withdraw(amount_x, amount_y)?;
        self.ledger.deposit(token.admin(), coin_x);
        self.ledger.deposit(token.admin(), coin_y);

        tracing::info!(pool = %key, amount_x, amount_y, "Liquidity removed");
        self.events.emit(EventRecord::new(
            key.owner,
            Event::LiquidityRemoved {
                owner: key.owner,
                amount_x,
                amount_y,
                timestamp: self.clock.now(),
            },
        ));
        Ok(())
    }

    /// Pay the accumulated fees on both sides to the admin and reset the
    /// counters. Returns `(fee_x, fee_y)`.
    ///
    /// # Errors
    /// - `NotAuthorized` if `caller` isn't the admin
    /// - `NotFound` if the admin has no pool for `pair`
    pub fn collect_fees(&self, caller: AccountId, pair: &TokenPair) -> Result<(u64, u64)> {
        let token = self.authority.authorize(caller)?;
        let key = PoolKey::new(token.admin(), pair.clone());
        let pool = self.pool(&key)?;
        let mut pool = pool.lock();

        let (fee_x, fee_y) = pool.take_fees()?;
        let (amount_x, amount_y) = (fee_x.value(), fee_y.value());
        self.ledger.deposit(token.admin(), fee_x);
        self.ledger.deposit(token.admin(), fee_y);

        tracing::info!(pool = %key, amount_x, amount_y, "Pool fees collected");
        self.events.emit(EventRecord::new(
            key.owner,
            Event::PoolFeesCollected {
                owner: key.owner,
                amount_x,
                amount_y,
                timestamp: self.clock.now(),
            },
        ));
        Ok((amount_x, amount_y))
    }

    // -----------------------------------------------------------------
    // Swaps
    // -----------------------------------------------------------------

    /// Sell `amount_in` of X from `user`'s balance for Y.
    ///
    /// # Errors
    /// - `NotFound` if the pool doesn't exist
    /// - `ZeroAmount` if `amount_in` or the output would be 0
    /// - `InsufficientLiquidity` if the trade would drain the Y reserve
    /// - `SlippageExceeded` if the output is below `min_amount_out`
    /// - `InsufficientBalance` if `user` can't pay `amount_in`
    pub fn swap_x_to_y(
        &self,
        user: AccountId,
        amount_in: u64,
        min_amount_out: u64,
        key: &PoolKey,
    ) -> Result<u64> {
        self.swap_from_account(user, key, Direction::XToY, amount_in, min_amount_out)
    }

    /// Sell `amount_in` of Y from `user`'s balance for X. Errors as for
    /// [`Self::swap_x_to_y`].
    pub fn swap_y_to_x(
        &self,
        user: AccountId,
        amount_in: u64,
        min_amount_out: u64,
        key: &PoolKey,
    ) -> Result<u64> {
        self.swap_from_account(user, key, Direction::YToX, amount_in, min_amount_out)
    }

    fn swap_from_account(
        &self,
        user: AccountId,
        key: &PoolKey,
        direction: Direction,
        amount_in: u64,
        min_amount_out: u64,
    ) -> Result<u64> {
        let pool = self.pool(key)?;
        let mut pool = pool.lock();

        // Price first so a rejected trade never touches the user's balance.
        let quote = pool.quote(direction, amount_in, self.config.fee_bps)?;
        check_slippage(key, &quote, min_amount_out)?;

        let (asset_in, _) = key.pair.sides(direction);
        let coin_in = self.ledger.withdraw(user, asset_in, amount_in)?;
        match self.settle(&mut pool, key, user, &quote, coin_in) {
            Ok(coin_out) => {
                let amount_out = coin_out.value();
                self.ledger.deposit(user, coin_out);
                Ok(amount_out)
            }
            Err(rejection) => {
                let (err, refund) = rejection.into_parts();
                self.ledger.deposit(user, refund);
                Err(err)
            }
        }
    }

    /// Swap a coin already in the caller's custody. `trader` is only used to
    /// attribute the event. On any failure `coin_in` comes back in the
    /// rejection untouched.
    ///
    /// # Errors
    /// As for [`Self::swap_x_to_y`], plus `AssetMismatch` if `coin_in`
    /// isn't the input asset for `direction`.
    pub fn swap_coin(
        &self,
        trader: AccountId,
        key: &PoolKey,
        direction: Direction,
        coin_in: Coin,
        min_amount_out: u64,
    ) -> std::result::Result<Coin, CoinRejection> {
        let pool = match self.pool(key) {
            Ok(pool) => pool,
            Err(e) => return Err(CoinRejection::new(e, coin_in)),
        };
        let mut pool = pool.lock();

        let (asset_in, _) = key.pair.sides(direction);
        if coin_in.asset() != asset_in {
            let error = SettleError::AssetMismatch {
                expected: asset_in.to_string(),
                actual: coin_in.asset().to_string(),
            };
            return Err(CoinRejection::new(error, coin_in));
        }
        let quote = match pool
            .quote(direction, coin_in.value(), self.config.fee_bps)
            .and_then(|q| check_slippage(key, &q, min_amount_out).map(|()| q))
        {
            Ok(quote) => quote,
            Err(e) => return Err(CoinRejection::new(e, coin_in)),
        };
        self.settle(&mut pool, key, trader, &quote, coin_in)
    }

    /// Apply a validated quote to a locked pool and record it.
    fn settle(
        &self,
        pool: &mut Pool,
        key: &PoolKey,
        trader: AccountId,
        quote: &SwapQuote,
        coin_in: Coin,
    ) -> std::result::Result<Coin, CoinRejection> {
        let coin_out = pool.apply(quote, coin_in)?;

        tracing::info!(
            pool = %key,
            user = %trader,
            direction = %quote.direction,
            amount_in = quote.amount_in,
            amount_out = quote.amount_out,
            fee = quote.fee,
            "Pool swap"
        );
        self.events.emit(EventRecord::new(
            key.owner,
            Event::PoolSwap {
                owner: key.owner,
                user: trader,
                direction: quote.direction,
                amount_in: quote.amount_in,
                amount_out: quote.amount_out,
                fee: quote.fee,
                timestamp: self.clock.now(),
            },
        ));
        Ok(coin_out)
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    pub fn get_pool_info(&self, key: &PoolKey) -> Result<PoolInfo> {
        Ok(self.pool(key)?.lock().info())
    }

    /// Reserves `(reserve_x, reserve_y)`, uncollected fees included.
    pub fn get_pool_liquidity(&self, key: &PoolKey) -> Result<(u64, u64)> {
        let pool = self.pool(key)?;
        let pool = pool.lock();
        Ok((pool.reserve_x(), pool.reserve_y()))
    }

    /// Y per X scaled by 1e8.
    ///
    /// # Errors
    /// `InsufficientLiquidity` if the X reserve is empty.
    pub fn calculate_price(&self, key: &PoolKey) -> Result<u64> {
        self.pool(key)?.lock().price()
    }

    /// [`Self::calculate_price`] as a decimal with 8 places.
    pub fn spot_price(&self, key: &PoolKey) -> Result<Decimal> {
        let scaled = self.calculate_price(key)?;
        Decimal::try_from_i128_with_scale(i128::from(scaled), PRICE_PRECISION)
            .map_err(|e| SettleError::Internal(e.to_string()))
    }

    /// `(amount_out, fee)` for selling `amount_in` of X. Exactly what
    /// [`Self::swap_x_to_y`] would pay out against the current reserves.
    pub fn get_quote_x_to_y(&self, key: &PoolKey, amount_in: u64) -> Result<(u64, u64)> {
        let q = self.quote(key, Direction::XToY, amount_in)?;
        Ok((q.amount_out, q.fee))
    }

    /// `(amount_out, fee)` for selling `amount_in` of Y.
    pub fn get_quote_y_to_x(&self, key: &PoolKey, amount_in: u64) -> Result<(u64, u64)> {
        let q = self.quote(key, Direction::YToX, amount_in)?;
        Ok((q.amount_out, q.fee))
    }

    /// Full pricing of `amount_in` in `direction` against the current reserves.
    pub fn quote(&self, key: &PoolKey, direction: Direction, amount_in: u64) -> Result<SwapQuote> {
        self.pool(key)?
            .lock()
            .quote(direction, amount_in, self.config.fee_bps)
    }

    /// How far the net input moves the input reserve, in basis points.
    pub fn price_impact_bps(
        &self,
        key: &PoolKey,
        direction: Direction,
        amount_in: u64,
    ) -> Result<u64> {
        Ok(self.quote(key, direction, amount_in)?.price_impact_bps)
    }

    /// Keys of every pool, sorted.
    #[must_use]
    pub fn pools(&self) -> Vec<PoolKey> {
        let mut keys: Vec<_> = self.pools.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Total value of `asset` in custody across all pools, fees included.
    #[must_use]
    pub fn held_total(&self, asset: &str) -> u64 {
        let pools: Vec<_> = self.pools.read().values().cloned().collect();
        pools.iter().map(|p| p.lock().held(asset)).sum()
    }
}

fn check_slippage(key: &PoolKey, quote: &SwapQuote, min_amount_out: u64) -> Result<()> {
    if quote.amount_out < min_amount_out {
        tracing::warn!(
            pool = %key,
            amount_out = quote.amount_out,
            min_amount_out,
            "Swap rejected: slippage"
        );
        return Err(SettleError::SlippageExceeded {
            min_amount_out,
            amount_out: quote.amount_out,
        });
    }
    Ok(())
}
