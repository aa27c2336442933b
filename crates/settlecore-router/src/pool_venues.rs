//! Venues backed by [`EscrowPoolEngine`] pools.
//!
//! Each venue id maps to one pool, possibly of a different engine, and the
//! direction that sells the routed pair's input asset. Quotes use the same
//! pricing the pool executes with, so an uncontended quote is exactly what
//! the trade pays.

use std::collections::HashMap;
use std::sync::Arc;

use settlecore_ledger::{Coin, CoinRejection};
use settlecore_pool::EscrowPoolEngine;
use settlecore_types::{AccountId, Direction, PoolKey, SettleError, VenueId};

use crate::venue::{Quote, QuoteSource, VenueExecutor};

/// Where a venue's trades go.
struct PoolRoute {
    engine: Arc<EscrowPoolEngine>,
    key: PoolKey,
    direction: Direction,
}

pub struct PoolVenues {
    /// Account the pool engines attribute routed trades to.
    router: AccountId,
    routes: HashMap<VenueId, PoolRoute>,
}

impl PoolVenues {
    pub fn new(router: AccountId) -> Self {
        Self {
            router,
            routes: HashMap::new(),
        }
    }

    /// Route `venue` to the pool `key` of `engine`, trading in `direction`.
    #[must_use]
    pub fn with_venue(
        mut self,
        venue: VenueId,
        engine: Arc<EscrowPoolEngine>,
        key: PoolKey,
        direction: Direction,
    ) -> Self {
        self.routes.insert(
            venue,
            PoolRoute {
                engine,
                key,
                direction,
            },
        );
        self
    }

    /// The pool behind `venue`, if mapped.
    pub fn pool_of(&self, venue: VenueId) -> Option<&PoolKey> {
        self.routes.get(&venue).map(|r| &r.key)
    }
}

impl QuoteSource for PoolVenues {
    fn get_quote(&self, venue: VenueId, amount_in: u64) -> Quote {
        let Some(route) = self.routes.get(&venue) else {
            return Quote::NONE;
        };
        route
            .engine
            .quote(&route.key, route.direction, amount_in)
            .map_or(Quote::NONE, |q| Quote::new(q.amount_out, q.price_impact_bps))
    }
}

impl VenueExecutor for PoolVenues {
    fn execute(
        &self,
        venue: VenueId,
        coin_in: Coin,
        min_amount_out: u64,
    ) -> Result<Coin, CoinRejection> {
        let Some(route) = self.routes.get(&venue) else {
            return Err(CoinRejection::new(SettleError::InvalidVenueId(venue), coin_in));
        };
        route.engine.swap_coin(
            self.router,
            &route.key,
            route.direction,
            coin_in,
            min_amount_out,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use settlecore_ledger::{InMemoryLedger, LedgerAccess, NullEventSink};
    use settlecore_types::{Authority, ManualClock, PoolConfig, TokenPair};

    #[test]
    fn quotes_and_fills_from_the_mapped_pool() {
        let admin = AccountId::new();
        let user = AccountId::new();
        let router = AccountId::new();
        let pair = TokenPair::new("APT", "USDC");
        let ledger = Arc::new(InMemoryLedger::funded(&[
            (admin, "APT", 1000),
            (admin, "USDC", 1000),
            (user, "APT", 100),
        ]));
        let engine = Arc::new(
            EscrowPoolEngine::new(
                PoolConfig::default(),
                Authority::new(admin),
                ledger.clone(),
                Arc::new(NullEventSink),
                Arc::new(ManualClock::new(0)),
            )
            .unwrap(),
        );
        let key = engine.create_pool(admin, &pair, 1000, 1000).unwrap();
        let venues = PoolVenues::new(router).with_venue(
            VenueId(1),
            engine.clone(),
            key.clone(),
            Direction::XToY,
        );
        assert_eq!(venues.pool_of(VenueId(1)), Some(&key));

        assert_eq!(venues.get_quote(VenueId(2), 100), Quote::NONE);
        let quote = venues.get_quote(VenueId(1), 100);
        assert_eq!(quote.amount_out, 90);

        let coin = ledger.withdraw(user, "APT", 100).unwrap();
        let out = venues.execute(VenueId(1), coin, 90).unwrap();
        assert_eq!(out.value(), quote.amount_out);
        ledger.deposit(user, out);
        assert_eq!(engine.get_pool_liquidity(&key).unwrap(), (1100, 910));
    }
}
