//! Venue descriptors, route summaries and the two ports the aggregator
//! reaches venues through.

use serde::{Deserialize, Serialize};
use settlecore_ledger::{Coin, CoinRejection};
use settlecore_types::{AccountId, VenueId};

/// A registered venue and its running statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueInfo {
    pub id: VenueId,
    pub name: String,
    pub enabled: bool,
    pub total_volume: u64,
    pub swap_count: u64,
}

impl VenueInfo {
    pub(crate) fn new(id: VenueId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            enabled: true,
            total_volume: 0,
            swap_count: 0,
        }
    }
}

/// A venue's answer to "what would `amount_in` get me?".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub amount_out: u64,
    pub price_impact_bps: u64,
}

impl Quote {
    /// The "no liquidity" answer.
    pub const NONE: Self = Self {
        amount_out: 0,
        price_impact_bps: 0,
    };

    #[must_use]
    pub fn new(amount_out: u64, price_impact_bps: u64) -> Self {
        Self {
            amount_out,
            price_impact_bps,
        }
    }

    #[must_use]
    pub fn has_liquidity(&self) -> bool {
        self.amount_out > 0
    }
}

/// Prices a trade at a venue. Must be free of side effects.
pub trait QuoteSource: Send + Sync {
    /// Quote selling `amount_in` at `venue`. [`Quote::NONE`] means the venue
    /// can't fill it.
    fn get_quote(&self, venue: VenueId, amount_in: u64) -> Quote;
}

/// Executes a routed trade at a venue.
pub trait VenueExecutor: Send + Sync {
    /// Trade `coin_in` at `venue` for at least `min_amount_out` of the
    /// output asset. On failure the untouched input is handed back.
    fn execute(
        &self,
        venue: VenueId,
        coin_in: Coin,
        min_amount_out: u64,
    ) -> Result<Coin, CoinRejection>;
}

/// Winner of a best-route search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestRoute {
    pub venue_id: VenueId,
    pub amount_out: u64,
    pub price_impact_bps: u64,
}

/// One enabled venue's quote, as listed by `get_all_routes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub venue_id: VenueId,
    pub venue_name: String,
    pub amount_in: u64,
    pub amount_out: u64,
    pub price_impact_bps: u64,
    pub estimated_fee: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceComparison {
    pub best_venue_id: VenueId,
    pub best_output: u64,
    pub worst_output: u64,
    pub price_diff_bps: u64,
}

/// What a routed swap actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutedRoute {
    pub venue_id: VenueId,
    /// Gross input taken from the user.
    pub amount_in: u64,
    /// Aggregator fee paid to the admin out of `amount_in`.
    pub fee: u64,
    pub amount_out: u64,
}

/// Registry-wide totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorStats {
    pub admin: AccountId,
    pub total_volume: u64,
    pub total_swaps: u64,
    pub fees_collected: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_venue_starts_enabled_and_empty() {
        let v = VenueInfo::new(VenueId(3), "Thala");
        assert!(v.enabled);
        assert_eq!((v.total_volume, v.swap_count), (0, 0));
    }

    #[test]
    fn none_quote_has_no_liquidity() {
        assert!(!Quote::NONE.has_liquidity());
        assert!(Quote::new(1, 0).has_liquidity());
        assert_eq!(Quote::default(), Quote::NONE);
    }

    #[test]
    fn route_info_serializes() {
        let route = RouteInfo {
            venue_id: VenueId(1),
            venue_name: "Liquidswap".into(),
            amount_in: 10_000,
            amount_out: 9_750,
            price_impact_bps: 12,
            estimated_fee: 5,
        };
        let json = serde_json::to_string(&route).unwrap();
        let back: RouteInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, route);
    }
}
