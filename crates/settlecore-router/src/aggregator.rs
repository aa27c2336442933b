//! Route aggregator.
//!
//! Holds a single venue registry behind one lock. Quoting goes through a
//! [`QuoteSource`], execution through a [`VenueExecutor`]; both are
//! injected. A routed swap takes the aggregator fee out of the user's
//! input first and sends only the remainder to the venue.

use std::sync::Arc;

use parking_lot::Mutex;
use settlecore_ledger::{EventSink, LedgerAccess};
use settlecore_types::{
    AccountId, AggregatorConfig, Authority, Clock, Event, EventRecord, Result, SettleError,
    TokenPair, VenueId, math,
};

use crate::registry::VenueRegistry;
use crate::venue::{
    AggregatorStats, BestRoute, ExecutedRoute, PriceComparison, QuoteSource, RouteInfo,
    VenueExecutor, VenueInfo,
};

/// Compares venue quotes and routes swaps to the best (or a chosen) venue.
pub struct RouteAggregator {
    config: AggregatorConfig,
    authority: Authority,
    registry: Mutex<Option<VenueRegistry>>,
    quotes: Arc<dyn QuoteSource>,
    executor: Arc<dyn VenueExecutor>,
    ledger: Arc<dyn LedgerAccess>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl RouteAggregator {
    /// Create an uninitialized aggregator. Nothing can be routed until the
    /// admin calls [`Self::initialize`].
    ///
    /// # Errors
    /// Returns `Configuration` if `config` is invalid.
    pub fn new(
        config: AggregatorConfig,
        authority: Authority,
        quotes: Arc<dyn QuoteSource>,
        executor: Arc<dyn VenueExecutor>,
        ledger: Arc<dyn LedgerAccess>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            authority,
            registry: Mutex::new(None),
            quotes,
            executor,
            ledger,
            events,
            clock,
        })
    }

    /// Run `f` against the registry under its lock.
    fn with_registry<T>(&self, f: impl FnOnce(&mut VenueRegistry) -> Result<T>) -> Result<T> {
        let mut guard = self.registry.lock();
        let registry = guard.as_mut().ok_or(SettleError::NotInitialized)?;
        f(registry)
    }

    fn emit(&self, registry: &VenueRegistry, event: Event) {
        self.events.emit(EventRecord::new(registry.admin, event));
    }

    // -----------------------------------------------------------------
    // Admin
    // -----------------------------------------------------------------

    /// Register the configured venues as ids `1..=N`, all enabled.
    ///
    /// # Errors
    /// - `NotAuthorized` if `caller` isn't the admin
    /// - `AlreadyInitialized` on a second call
    pub fn initialize(&self, caller: AccountId) -> Result<()> {
        let token = self.authority.authorize(caller)?;
        let mut guard = self.registry.lock();
        if guard.is_some() {
            return Err(SettleError::AlreadyInitialized);
        }
        let registry = VenueRegistry::new(token.admin(), &self.config.venues)?;
        let venues = u8::try_from(registry.len())
            .map_err(|_| SettleError::Configuration("too many venues".into()))?;

        tracing::info!(
            admin = %token.admin(),
            pair = %self.config.pair,
            venues,
            fee_bps = self.config.fee_bps,
            "Route aggregator initialized"
        );
        self.emit(
            &registry,
            Event::RouterInitialized {
                admin: token.admin(),
                venues,
                timestamp: self.clock.now(),
            },
        );
        *guard = Some(registry);
        Ok(())
    }

    /// Include or exclude a venue from routing.
    ///
    /// # Errors
    /// - `NotAuthorized` if `caller` isn't the admin
    /// - `NotInitialized` before [`Self::initialize`]
    /// - `InvalidVenueId` if no such venue is registered
    pub fn toggle_venue(
        &self,
        caller: AccountId,
        venue_id: VenueId,
        enabled: bool,
    ) -> Result<()> {
        self.authority.authorize(caller)?;
        self.with_registry(|registry| {
            registry.get_mut(venue_id)?.enabled = enabled;
            tracing::info!(venue = %venue_id, enabled, "Venue toggled");
            self.emit(
                registry,
                Event::VenueToggled {
                    venue_id,
                    enabled,
                    timestamp: self.clock.now(),
                },
            );
            Ok(())
        })
    }

    /// Write down `amount` of the fee counter. The fees themselves were
    /// paid to the admin when each swap executed.
    ///
    /// # Errors
    /// - `NotAuthorized` if `caller` isn't the admin
    /// - `NotInitialized` before [`Self::initialize`]
    /// - `ZeroAmount` if `amount` is 0
    /// - `InsufficientFees` if `amount` exceeds the recorded fees
    pub fn collect_fees(&self, caller: AccountId, amount: u64) -> Result<()> {
        let token = self.authority.authorize(caller)?;
        self.with_registry(|registry| {
            if amount == 0 {
                return Err(SettleError::ZeroAmount);
            }
            if amount > registry.fees_collected {
                return Err(SettleError::InsufficientFees {
                    requested: amount,
                    available: registry.fees_collected,
                });
            }
            registry.fees_collected -= amount;
            tracing::info!(admin = %token.admin(), amount, "Router fees collected");
            self.emit(
                registry,
                Event::RouterFeesCollected {
                    admin: token.admin(),
                    amount,
                    timestamp: self.clock.now(),
                },
            );
            Ok(())
        })
    }

    // -----------------------------------------------------------------
    // Quoting
    // -----------------------------------------------------------------

    /// Single pass over enabled venues in id order; a later venue only
    /// wins with a strictly greater output. Also returns the smallest
    /// positive output seen.
    fn scan_routes(&self, registry: &VenueRegistry, amount_in: u64) -> Result<(BestRoute, u64)> {
        let mut best: Option<BestRoute> = None;
        let mut worst = u64::MAX;
        for venue in registry.enabled() {
            let quote = self.quotes.get_quote(venue.id, amount_in);
            if !quote.has_liquidity() {
                continue;
            }
            worst = worst.min(quote.amount_out);
            if quote.amount_out > best.map_or(0, |b| b.amount_out) {
                best = Some(BestRoute {
                    venue_id: venue.id,
                    amount_out: quote.amount_out,
                    price_impact_bps: quote.price_impact_bps,
                });
            }
        }
        best.map(|b| (b, worst)).ok_or(SettleError::NoRoutesFound)
    }

    fn best_route(&self, registry: &VenueRegistry, amount_in: u64) -> Result<BestRoute> {
        self.scan_routes(registry, amount_in).map(|(best, _)| best)
    }

    /// The enabled venue offering the most output for `amount_in`.
    ///
    /// # Errors
    /// - `NotInitialized` before [`Self::initialize`]
    /// - `ZeroAmount` if `amount_in` is 0
    /// - `NoRoutesFound` if no enabled venue quotes a positive output
    pub fn find_best_route(&self, amount_in: u64) -> Result<BestRoute> {
        self.with_registry(|registry| {
            if amount_in == 0 {
                return Err(SettleError::ZeroAmount);
            }
            self.best_route(registry, amount_in)
        })
    }

    /// Every enabled venue with a positive quote, in id order.
    pub fn get_all_routes(&self, amount_in: u64) -> Result<Vec<RouteInfo>> {
        self.with_registry(|registry| {
            if amount_in == 0 {
                return Err(SettleError::ZeroAmount);
            }
            let estimated_fee = math::bps_of(amount_in, self.config.fee_bps)?;
            Ok(registry
                .enabled()
                .filter_map(|venue| {
                    let quote = self.quotes.get_quote(venue.id, amount_in);
                    quote.has_liquidity().then(|| RouteInfo {
                        venue_id: venue.id,
                        venue_name: venue.name.clone(),
                        amount_in,
                        amount_out: quote.amount_out,
                        price_impact_bps: quote.price_impact_bps,
                        estimated_fee,
                    })
                })
                .collect())
        })
    }

    /// Spread between the best and worst positive quote, recorded as a
    /// `RouteComparison` event.
    ///
    /// # Errors
    /// As for [`Self::find_best_route`].
    pub fn compare_prices(&self, amount_in: u64) -> Result<PriceComparison> {
        self.with_registry(|registry| {
            if amount_in == 0 {
                return Err(SettleError::ZeroAmount);
            }
            let (best, worst_output) = self.scan_routes(registry, amount_in)?;
            let price_diff_bps = math::price_diff_bps(best.amount_out, worst_output)?;
            let comparison = PriceComparison {
                best_venue_id: best.venue_id,
                best_output: best.amount_out,
                worst_output,
                price_diff_bps,
            };

            tracing::debug!(
                amount_in,
                best = %best.venue_id,
                best_output = best.amount_out,
                worst_output,
                price_diff_bps,
                "Routes compared"
            );
            self.emit(
                registry,
                Event::RouteComparison {
                    amount_in,
                    best_venue_id: best.venue_id,
                    best_output: best.amount_out,
                    worst_output,
                    price_diff_bps,
                    timestamp: self.clock.now(),
                },
            );
            Ok(comparison)
        })
    }

    // -----------------------------------------------------------------
    // Swaps
    // -----------------------------------------------------------------

    /// Sell `amount_in` of the routed pair's X at the best venue.
    ///
    /// # Errors
    /// - `NotInitialized`, `ZeroAmount`, `NoRoutesFound` as for
    ///   [`Self::find_best_route`]
    /// - `SlippageExceeded` if the best quote is below `min_amount_out`
    /// - `InsufficientBalance` if `user` can't pay `amount_in`
    /// - `SlippageExceeded` or `InsufficientLiquidity` if the venue can't
    ///   fill the net input at `min_amount_out`, and `VenueUnavailable` if
    ///   it fails for any other reason; the user is refunded in full
    pub fn swap_best_route(
        &self,
        user: AccountId,
        amount_in: u64,
        min_amount_out: u64,
    ) -> Result<ExecutedRoute> {
        self.with_registry(|registry| {
            if amount_in == 0 {
                return Err(SettleError::ZeroAmount);
            }
            let best = self.best_route(registry, amount_in)?;
            self.route_swap(
                registry,
                user,
                best.venue_id,
                best.amount_out,
                amount_in,
                min_amount_out,
            )
        })
    }

    /// Sell `amount_in` at a venue chosen by the caller.
    ///
    /// # Errors
    /// - `InvalidVenueId` if no such venue is registered
    /// - `VenueUnavailable` if it is disabled
    /// - `InsufficientLiquidity` if it quotes no output
    /// - otherwise as for [`Self::swap_best_route`]
    pub fn swap_specific_venue(
        &self,
        user: AccountId,
        venue_id: VenueId,
        amount_in: u64,
        min_amount_out: u64,
    ) -> Result<ExecutedRoute> {
        self.with_registry(|registry| {
            if amount_in == 0 {
                return Err(SettleError::ZeroAmount);
            }
            if !registry.get(venue_id)?.enabled {
                return Err(SettleError::VenueUnavailable(venue_id));
            }
            let quote = self.quotes.get_quote(venue_id, amount_in);
            if !quote.has_liquidity() {
                return Err(SettleError::InsufficientLiquidity);
            }
            self.route_swap(
                registry,
                user,
                venue_id,
                quote.amount_out,
                amount_in,
                min_amount_out,
            )
        })
    }

    fn route_swap(
        &self,
        registry: &mut VenueRegistry,
        user: AccountId,
        venue_id: VenueId,
        quoted_out: u64,
        amount_in: u64,
        min_amount_out: u64,
    ) -> Result<ExecutedRoute> {
        if quoted_out < min_amount_out {
            tracing::warn!(
                venue = %venue_id,
                quoted_out,
                min_amount_out,
                "Routed swap rejected: slippage"
            );
            return Err(SettleError::SlippageExceeded {
                min_amount_out,
                amount_out: quoted_out,
            });
        }
        let fee = math::bps_of(amount_in, self.config.fee_bps)?;
        let venue_volume = registry
            .get(venue_id)?
            .total_volume
            .checked_add(amount_in)
            .ok_or(SettleError::ArithmeticOverflow)?;
        let total_volume = registry
            .total_volume
            .checked_add(amount_in)
            .ok_or(SettleError::ArithmeticOverflow)?;
        let fees_collected = registry
            .fees_collected
            .checked_add(fee)
            .ok_or(SettleError::ArithmeticOverflow)?;

        let mut coin_in = self.ledger.withdraw(user, &self.config.pair.x, amount_in)?;
        let fee_coin = match coin_in.extract(fee) {
            Ok(coin) => coin,
            Err(e) => {
                self.ledger.deposit(user, coin_in);
                return Err(e);
            }
        };
        let coin_out = match self.executor.execute(venue_id, coin_in, min_amount_out) {
            Ok(coin) => coin,
            Err(rejection) => {
                let (err, refund) = rejection.into_parts();
                tracing::warn!(
                    venue = %venue_id,
                    user = %user,
                    error = %err,
                    "Venue rejected routed swap"
                );
                self.ledger.deposit(user, refund);
                self.ledger.deposit(user, fee_coin);
                return Err(venue_failure(venue_id, err));
            }
        };
        let amount_out = coin_out.value();
        self.ledger.deposit(registry.admin, fee_coin);
        self.ledger.deposit(user, coin_out);

        let venue = registry.get_mut(venue_id)?;
        venue.total_volume = venue_volume;
        venue.swap_count += 1;
        registry.total_volume = total_volume;
        registry.total_swaps += 1;
        registry.fees_collected = fees_collected;

        tracing::info!(
            user = %user,
            venue = %venue_id,
            amount_in,
            amount_out,
            fee,
            "Aggregated swap"
        );
        self.emit(
            registry,
            Event::AggregatedSwap {
                user,
                venue_id,
                amount_in,
                amount_out,
                fee,
                timestamp: self.clock.now(),
            },
        );
        Ok(ExecutedRoute {
            venue_id,
            amount_in,
            fee,
            amount_out,
        })
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.registry.lock().is_some()
    }

    #[must_use]
    pub fn pair(&self) -> &TokenPair {
        &self.config.pair
    }

    /// Snapshot of every registered venue, in id order.
    pub fn venues(&self) -> Result<Vec<VenueInfo>> {
        self.with_registry(|registry| Ok(registry.venues().to_vec()))
    }

    pub fn stats(&self) -> Result<AggregatorStats> {
        self.with_registry(|registry| Ok(registry.stats()))
    }
}

/// The error a caller sees when a venue refuses a routed trade. Price and
/// depth failures pass through so the caller can retry with other terms;
/// anything else means the venue itself failed.
fn venue_failure(venue_id: VenueId, err: SettleError) -> SettleError {
    match err {
        SettleError::SlippageExceeded { .. } | SettleError::InsufficientLiquidity => err,
        _ => SettleError::VenueUnavailable(venue_id),
    }
}
